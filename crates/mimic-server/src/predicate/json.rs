//! Structured-document matchers for JSON bodies.

use super::matcher::ValueMatcher;
use serde_json::Value;
use serde_json_path::JsonPath;

/// Semantic JSON equality (`isSameJsonObject`).
///
/// Key order and insignificant whitespace are ignored. Input that is not
/// valid JSON never matches.
#[derive(Debug, Clone)]
pub struct SameJsonMatcher {
    expected: Value,
}

impl SameJsonMatcher {
    pub fn new(expected: Value) -> Self {
        Self { expected }
    }
}

impl ValueMatcher for SameJsonMatcher {
    fn is_satisfied_by(&self, input: &str) -> bool {
        serde_json::from_str::<Value>(input)
            .map(|actual| actual == self.expected)
            .unwrap_or(false)
    }
}

/// JSONPath query (RFC 9535) followed by an inner matcher on the first node.
#[derive(Debug)]
pub struct JsonPathMatcher {
    path: JsonPath,
    inner: Box<dyn ValueMatcher>,
}

impl JsonPathMatcher {
    pub fn new(path: &str, inner: Box<dyn ValueMatcher>) -> Result<Self, serde_json_path::ParseError> {
        Ok(Self {
            path: JsonPath::parse(path)?,
            inner,
        })
    }

    /// Extract the first node selected by the path, stringified.
    pub fn extract(&self, input: &str) -> Option<String> {
        let document: Value = serde_json::from_str(input).ok()?;
        let node = self.path.query(&document).all().into_iter().next()?;
        Some(stringify_node(node))
    }
}

impl ValueMatcher for JsonPathMatcher {
    fn is_satisfied_by(&self, input: &str) -> bool {
        self.extract(input)
            .is_some_and(|value| self.inner.is_satisfied_by(&value))
    }

    fn captures(&self, input: &str) -> Vec<String> {
        self.extract(input)
            .map(|value| self.inner.captures(&value))
            .unwrap_or_default()
    }
}

/// Strings are returned unquoted; every other node as compact JSON.
fn stringify_node(node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
