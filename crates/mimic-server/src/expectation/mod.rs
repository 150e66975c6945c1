//! Expectations: model, live store, startup backup and file loader.

mod backup;
mod loader;
mod store;
mod types;

pub use backup::Backup;
pub use loader::{ExpectationLoader, LoadError};
pub use store::{ExpectationSnapshot, ExpectationStore};
pub use types::{
    Expectation, ExpectationBuilder, ExpectationDefinition, ExpectationError, ExpectationId,
    FaultKind, ResponseEncoding, ResponseRecipe, ScenarioClause, StaticResponse,
    DEFAULT_FAULT_DELAY_MILLIS,
};
