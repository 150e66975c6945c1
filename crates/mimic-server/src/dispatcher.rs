//! Per-request dispatch: record, select, transition, build.
//!
//! [`MockState`] owns the stores. Recording, selection, usage counting and the
//! scenario transition for one request all happen under a single dispatch
//! lock, so two concurrent requests can never both observe the same
//! pre-transition state. Response construction runs after the lock is
//! released, on the caller's own `Arc` of the winning expectation.

use crate::expectation::{Backup, Expectation, ExpectationId, ExpectationStore};
use crate::history::{RecordedRequest, RequestHistoryStore};
use crate::predicate::expectation_matches;
use crate::response::{build_response, loggable_body, MockReply, ResponseStrategyLocator};
use crate::scenario::ScenarioStore;
use hyper::StatusCode;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The process-wide stores shared by every request.
#[derive(Debug, Default)]
pub struct MockState {
    expectations: ExpectationStore,
    scenarios: ScenarioStore,
    history: RequestHistoryStore,
    dispatch_lock: Mutex<()>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded with the backup's expectations.
    pub fn with_backup(backup: &Backup) -> Self {
        let state = Self::new();
        state.expectations.replace_all(backup);
        state
    }

    pub fn expectations(&self) -> &ExpectationStore {
        &self.expectations
    }

    pub fn scenarios(&self) -> &ScenarioStore {
        &self.scenarios
    }

    pub fn history(&self) -> &RequestHistoryStore {
        &self.history
    }

    /// Record `request` and select the expectation answering it.
    ///
    /// The winner's usage is counted and its scenario transition applied
    /// before the lock is released.
    pub fn select(
        &self,
        request: RecordedRequest,
    ) -> (Arc<RecordedRequest>, Option<Arc<Expectation>>) {
        let _guard = self.dispatch_lock.lock();

        let request = self.history.record(request);
        let best = self.find_best_match(&request);

        if let Some(ref expectation) = best {
            self.expectations.mark_used(expectation);
            if let Some(scenario) = expectation.scenario() {
                if let Some(ref new_state) = scenario.new_state {
                    debug!(
                        "Scenario '{}' transitions to '{}'",
                        scenario.name, new_state
                    );
                    self.scenarios.set_state(scenario.name.clone(), new_state.clone());
                }
            }
        }

        (request, best)
    }

    /// Highest-priority matching expectation; the earliest inserted wins ties.
    ///
    /// Exhausted expectations are skipped. Pure: nothing is recorded or changed.
    pub fn find_best_match(&self, request: &RecordedRequest) -> Option<Arc<Expectation>> {
        let mut best: Option<&Arc<Expectation>> = None;
        let snapshot = self.expectations.list();

        for expectation in &snapshot {
            if self.expectations.is_exhausted(expectation)
                || !expectation_matches(request, expectation, &self.scenarios)
            {
                continue;
            }
            match best {
                Some(current) if expectation.priority() <= current.priority() => {}
                _ => best = Some(expectation),
            }
        }

        best.cloned()
    }

    /// Restore the backup and clear scenarios and history.
    pub fn reset(&self, backup: &Backup) {
        let _guard = self.dispatch_lock.lock();
        self.expectations.replace_all(backup);
        self.scenarios.clear();
        self.history.clear();
        debug!("Pre-defined expectations are restored, scenarios and requests history are cleared.");
    }

    pub fn add_expectation(&self, expectation: Expectation) -> ExpectationId {
        let _guard = self.dispatch_lock.lock();
        self.expectations.add(expectation)
    }

    pub fn remove_expectation(&self, id: ExpectationId) -> bool {
        let _guard = self.dispatch_lock.lock();
        self.expectations.remove(id)
    }

    pub fn clear_expectations(&self) {
        let _guard = self.dispatch_lock.lock();
        self.expectations.clear();
    }

    pub fn set_scenario_state(&self, name: impl Into<String>, state: impl Into<String>) {
        let _guard = self.dispatch_lock.lock();
        self.scenarios.set_state(name, state);
    }

    pub fn clear_scenarios(&self) {
        let _guard = self.dispatch_lock.lock();
        self.scenarios.clear();
    }

    pub fn clear_history(&self) {
        let _guard = self.dispatch_lock.lock();
        self.history.clear();
    }
}

/// Answers mock requests.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<MockState>,
    locator: Arc<ResponseStrategyLocator>,
}

impl Dispatcher {
    pub fn new(state: Arc<MockState>, locator: Arc<ResponseStrategyLocator>) -> Self {
        Self { state, locator }
    }

    pub fn state(&self) -> &Arc<MockState> {
        &self.state
    }

    pub async fn dispatch(&self, request: RecordedRequest) -> MockReply {
        info!(
            "Request received: {}: {} || {}",
            request.method,
            request.full_uri(),
            loggable_body(&request.body)
        );

        let (request, selected) = self.state.select(request);

        let Some(expectation) = selected else {
            debug!("No expectation matched");
            return MockReply::Respond(build_response(StatusCode::NOT_FOUND, "Not Found"));
        };

        let strategy = self.locator.locate(&expectation);
        debug!(
            expectation_id = ?expectation.id(),
            "Matched expectation, using {} strategy",
            strategy.name()
        );

        match strategy.build(&expectation, &request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Failed to build response: {}", e);
                MockReply::Respond(build_response(e.status(), e.to_string()))
            }
        }
    }
}
