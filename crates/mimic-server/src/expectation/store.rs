use super::backup::Backup;
use super::types::{Expectation, ExpectationId};
use crate::snapshot::{CowVec, Snapshot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Restartable view of the stored expectations in insertion order.
pub type ExpectationSnapshot = Snapshot<Expectation>;

/// Ordered collection of active expectations.
///
/// Membership changes swap the whole sequence, so a [`list`](Self::list)
/// never observes a half-applied `add`, `remove` or `clear`. Usage counts for
/// expectations with a `usageLimit` live beside the sequence and are reset
/// whenever membership is replaced wholesale.
#[derive(Debug, Default)]
pub struct ExpectationStore {
    expectations: CowVec<Expectation>,
    usage: Mutex<HashMap<ExpectationId, u32>>,
}

impl ExpectationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `expectation` with a fresh id. Any id it carried is ignored.
    pub fn add(&self, expectation: Expectation) -> ExpectationId {
        let id = ExpectationId::new();
        self.expectations.push(Arc::new(expectation.with_id(id)));
        id
    }

    pub fn list(&self) -> ExpectationSnapshot {
        self.expectations.snapshot()
    }

    pub fn clear(&self) {
        self.expectations.clear();
        self.usage.lock().clear();
    }

    /// Remove by id without reordering the rest. Returns whether it existed.
    pub fn remove(&self, id: ExpectationId) -> bool {
        let removed = self.expectations.retain(|e| e.id() != Some(id));
        self.usage.lock().remove(&id);
        removed > 0
    }

    /// Replace the contents with the backup's expectations, keeping their ids.
    pub fn replace_all(&self, backup: &Backup) {
        self.expectations.replace(backup.expectations().to_vec());
        self.usage.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `expectation` has reached its usage limit.
    pub fn is_exhausted(&self, expectation: &Expectation) -> bool {
        match (expectation.usage_limit(), expectation.id()) {
            (Some(limit), Some(id)) => self.usage.lock().get(&id).copied().unwrap_or(0) >= limit,
            _ => false,
        }
    }

    /// Count one selection of `expectation`.
    pub fn mark_used(&self, expectation: &Expectation) {
        if expectation.usage_limit().is_none() {
            return;
        }
        if let Some(id) = expectation.id() {
            *self.usage.lock().entry(id).or_insert(0) += 1;
        }
    }
}
