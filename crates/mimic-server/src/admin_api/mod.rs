//! Control-plane REST API, served on the mock listener under [`ADMIN_PREFIX`].
//!
//! - Registering, listing, removing and clearing expectations
//! - Forcing, listing and clearing scenario states
//! - Searching, counting and clearing request history
//! - Reset to the pre-defined expectations, and a health probe
//!
//! Admin requests are never recorded and never matched against expectations.

mod handlers;
mod router;
pub mod types;

pub use router::{is_admin_path, route_by_path, route_request};

use crate::dispatcher::MockState;
use crate::expectation::Backup;
use std::sync::Arc;

/// Path prefix of every admin route.
pub const ADMIN_PREFIX: &str = "/__mimic";

/// What the admin handlers operate on.
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub state: Arc<MockState>,
    pub backup: Backup,
}

impl AdminContext {
    pub fn new(state: Arc<MockState>, backup: Backup) -> Self {
        Self { state, backup }
    }
}
