use super::types::{Expectation, ExpectationId};
use std::sync::Arc;

/// Expectations loaded at startup; the source of truth for reset.
///
/// Fresh ids are assigned once on construction, ignoring any id a file
/// carried, so every reset restores the same identities in the same order.
#[derive(Debug, Clone, Default)]
pub struct Backup {
    expectations: Arc<Vec<Arc<Expectation>>>,
}

impl Backup {
    pub fn from_expectations(expectations: Vec<Expectation>) -> Self {
        let expectations = expectations
            .into_iter()
            .map(|e| Arc::new(e.with_id(ExpectationId::new())))
            .collect();
        Self {
            expectations: Arc::new(expectations),
        }
    }

    pub fn expectations(&self) -> &[Arc<Expectation>] {
        &self.expectations
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    pub fn ids(&self) -> Vec<ExpectationId> {
        self.expectations.iter().filter_map(|e| e.id()).collect()
    }
}
