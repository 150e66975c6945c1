//! Scenario state store.
//!
//! A scenario that has never been set is in [`INITIAL_STATE`]. Entries are
//! created lazily by the first transition.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// State every scenario starts in.
pub const INITIAL_STATE: &str = "Start";

#[derive(Debug, Default)]
pub struct ScenarioStore {
    states: RwLock<HashMap<String, String>>,
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `name`, or [`INITIAL_STATE`] if unseen.
    pub fn get_state(&self, name: &str) -> String {
        self.states
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(|| INITIAL_STATE.to_string())
    }

    pub fn set_state(&self, name: impl Into<String>, state: impl Into<String>) {
        self.states.write().insert(name.into(), state.into());
    }

    pub fn clear(&self) {
        self.states.write().clear();
    }

    /// Every scenario that has been explicitly set, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.states
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}
