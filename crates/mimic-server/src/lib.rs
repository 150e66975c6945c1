//! Mimic: a stand-alone HTTP mock server.
//!
//! Clients register expectations (a request predicate plus a response recipe)
//! over the admin API or from files, then send ordinary HTTP traffic. Each
//! request is recorded, matched against the expectations by priority and
//! scenario state, and answered by a static, delayed, proxied or faulty
//! response.

pub mod admin_api;
pub mod config;
pub mod dispatcher;
pub mod expectation;
pub mod history;
pub mod predicate;
pub mod response;
pub mod scenario;
pub mod server;
pub mod shutdown;
pub mod tls;

mod snapshot;

pub use dispatcher::{Dispatcher, MockState};
pub use server::{MockServer, ServerHandle};
pub use snapshot::Snapshot;
