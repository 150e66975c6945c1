//! Request matching.
//!
//! - [`matcher`]: the [`ValueMatcher`] capability and the string matchers
//! - [`json`]: JSON equality and JSONPath matchers
//! - [`condition`]: the declarative condition blocks clients send
//! - [`comparator`]: compiled request predicates and expectation matching

pub mod comparator;
pub mod condition;
pub mod json;
pub mod matcher;

pub use comparator::{expectation_matches, RequestPredicate};
pub use condition::{ConditionError, MatchCondition, RequestConditions};
pub use matcher::ValueMatcher;
