//! Matching capability shared by every request condition.
//!
//! Each condition clause of an expectation is compiled into a boxed
//! [`ValueMatcher`]. The comparator only ever asks a matcher whether an input
//! satisfies it, so new matcher kinds are added by implementing the trait.

use regex::Regex;
use std::fmt::Debug;
use std::sync::Arc;

/// A compiled matching capability over a single string input.
pub trait ValueMatcher: Debug + Send + Sync {
    /// Whether `input` satisfies this matcher.
    fn is_satisfied_by(&self, input: &str) -> bool;

    /// Capture groups produced by matching `input` (group 0 is the whole match).
    ///
    /// Matchers without capture support return an empty list.
    fn captures(&self, _input: &str) -> Vec<String> {
        Vec::new()
    }
}

/// A string value with pre-computed lowercase for case-insensitive matching.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    /// Original value (for case-sensitive matching)
    pub value: String,
    /// Pre-computed lowercase (for case-insensitive matching)
    pub lower: String,
}

impl CachedValue {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        Self { value, lower }
    }

    #[inline]
    pub fn equals(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value == self.value
        } else {
            value.to_lowercase() == self.lower
        }
    }

    #[inline]
    pub fn contained_in(&self, value: &str) -> bool {
        value.contains(&self.value)
    }
}

/// Exact, case-sensitive equality (`isEqualTo`).
#[derive(Debug, Clone)]
pub struct EqualsMatcher(CachedValue);

impl EqualsMatcher {
    pub fn new(expected: impl Into<String>) -> Self {
        Self(CachedValue::new(expected))
    }
}

impl ValueMatcher for EqualsMatcher {
    fn is_satisfied_by(&self, input: &str) -> bool {
        self.0.equals(input, true)
    }
}

/// Case-insensitive equality (`isSameString`).
#[derive(Debug, Clone)]
pub struct SameStringMatcher(CachedValue);

impl SameStringMatcher {
    pub fn new(expected: impl Into<String>) -> Self {
        Self(CachedValue::new(expected))
    }
}

impl ValueMatcher for SameStringMatcher {
    fn is_satisfied_by(&self, input: &str) -> bool {
        self.0.equals(input, false)
    }
}

/// Substring containment (`contains`).
#[derive(Debug, Clone)]
pub struct ContainsMatcher(CachedValue);

impl ContainsMatcher {
    pub fn new(needle: impl Into<String>) -> Self {
        Self(CachedValue::new(needle))
    }
}

impl ValueMatcher for ContainsMatcher {
    fn is_satisfied_by(&self, input: &str) -> bool {
        self.0.contained_in(input)
    }
}

/// Regular expression match (`matches`). Case sensitivity lives in the pattern.
#[derive(Debug, Clone)]
pub struct RegexMatcher(Arc<Regex>);

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Arc::new(Regex::new(pattern)?)))
    }
}

impl ValueMatcher for RegexMatcher {
    fn is_satisfied_by(&self, input: &str) -> bool {
        self.0.is_match(input)
    }

    fn captures(&self, input: &str) -> Vec<String> {
        match self.0.captures(input) {
            Some(caps) => caps
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
            None => Vec::new(),
        }
    }
}
