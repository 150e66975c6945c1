//! Declarative request conditions and their compilation into matchers.
//!
//! Conditions are what clients send and what listing returns; the compiled
//! matchers are what the comparator evaluates.

use super::json::{JsonPathMatcher, SameJsonMatcher};
use super::matcher::{ContainsMatcher, EqualsMatcher, RegexMatcher, SameStringMatcher, ValueMatcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while compiling a condition.
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("{0}: a condition needs exactly one operator (isEqualTo, isSameString, contains, matches, isSameJsonObject), found {1}")]
    OperatorCount(String, usize),
    #[error("{0}: invalid regular expression: {1}")]
    InvalidRegex(String, #[source] regex::Error),
    #[error("{0}: invalid JSON path: {1}")]
    InvalidJsonPath(String, #[source] serde_json_path::ParseError),
    #[error("{0}: isSameJsonObject must be a JSON value or a string holding JSON: {1}")]
    InvalidJson(String, #[source] serde_json::Error),
}

/// One condition clause, e.g. `{"matches": "^/api/"}`.
///
/// `jsonPath` narrows the input to the first selected node before the
/// operator is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_equal_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_same_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_same_json_object: Option<serde_json::Value>,
}

impl MatchCondition {
    pub fn is_equal_to(value: impl Into<String>) -> Self {
        Self {
            is_equal_to: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn is_same_string(value: impl Into<String>) -> Self {
        Self {
            is_same_string: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            contains: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn matches(pattern: impl Into<String>) -> Self {
        Self {
            matches: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn is_same_json_object(value: serde_json::Value) -> Self {
        Self {
            is_same_json_object: Some(value),
            ..Default::default()
        }
    }

    /// Narrow this condition to the node selected by `path`.
    pub fn at_json_path(mut self, path: impl Into<String>) -> Self {
        self.json_path = Some(path.into());
        self
    }

    /// Compile into a matcher. `field` names the clause in error messages.
    pub fn compile(&self, field: &str) -> Result<Box<dyn ValueMatcher>, ConditionError> {
        let operator: Box<dyn ValueMatcher> = match (
            &self.is_equal_to,
            &self.is_same_string,
            &self.contains,
            &self.matches,
            &self.is_same_json_object,
        ) {
            (Some(v), None, None, None, None) => Box::new(EqualsMatcher::new(v.as_str())),
            (None, Some(v), None, None, None) => Box::new(SameStringMatcher::new(v.as_str())),
            (None, None, Some(v), None, None) => Box::new(ContainsMatcher::new(v.as_str())),
            (None, None, None, Some(pattern), None) => Box::new(
                RegexMatcher::new(pattern)
                    .map_err(|e| ConditionError::InvalidRegex(field.to_string(), e))?,
            ),
            (None, None, None, None, Some(expected)) => {
                Box::new(SameJsonMatcher::new(parse_expected_json(field, expected)?))
            }
            _ => {
                return Err(ConditionError::OperatorCount(
                    field.to_string(),
                    self.operator_count(),
                ))
            }
        };

        match self.json_path {
            Some(ref path) => Ok(Box::new(
                JsonPathMatcher::new(path, operator)
                    .map_err(|e| ConditionError::InvalidJsonPath(field.to_string(), e))?,
            )),
            None => Ok(operator),
        }
    }

    fn operator_count(&self) -> usize {
        [
            self.is_equal_to.is_some(),
            self.is_same_string.is_some(),
            self.contains.is_some(),
            self.matches.is_some(),
            self.is_same_json_object.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// A string is treated as JSON text; any other value is used as-is.
fn parse_expected_json(
    field: &str,
    expected: &serde_json::Value,
) -> Result<serde_json::Value, ConditionError> {
    match expected {
        serde_json::Value::String(text) => serde_json::from_str(text)
            .map_err(|e| ConditionError::InvalidJson(field.to_string(), e)),
        other => Ok(other.clone()),
    }
}

/// The `request` block of an expectation. Absent clauses impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<MatchCondition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, MatchCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MatchCondition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form_fields: BTreeMap<String, MatchCondition>,
}
