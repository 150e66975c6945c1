//! Request comparator.
//!
//! A [`RequestPredicate`] is the compiled form of a [`RequestConditions`]
//! block. Every declared clause must hold; an absent clause places no
//! constraint on its aspect of the request.

use super::condition::{ConditionError, RequestConditions};
use super::matcher::ValueMatcher;
use crate::expectation::Expectation;
use crate::history::RecordedRequest;
use crate::scenario::ScenarioStore;

/// Compiled request predicate.
#[derive(Debug, Default)]
pub struct RequestPredicate {
    method: Option<String>,
    url: Option<Box<dyn ValueMatcher>>,
    headers: Vec<(String, Box<dyn ValueMatcher>)>,
    body: Option<Box<dyn ValueMatcher>>,
    form_fields: Vec<(String, Box<dyn ValueMatcher>)>,
}

impl RequestPredicate {
    pub fn compile(conditions: &RequestConditions) -> Result<Self, ConditionError> {
        let url = conditions
            .url
            .as_ref()
            .map(|c| c.compile("url"))
            .transpose()?;
        let body = conditions
            .body
            .as_ref()
            .map(|c| c.compile("body"))
            .transpose()?;

        let mut headers = Vec::with_capacity(conditions.headers.len());
        for (name, condition) in &conditions.headers {
            let matcher = condition.compile(&format!("headers.{name}"))?;
            headers.push((name.to_lowercase(), matcher));
        }

        let mut form_fields = Vec::with_capacity(conditions.form_fields.len());
        for (name, condition) in &conditions.form_fields {
            let matcher = condition.compile(&format!("formFields.{name}"))?;
            form_fields.push((name.clone(), matcher));
        }

        Ok(Self {
            method: conditions.method.as_ref().map(|m| m.to_uppercase()),
            url,
            headers,
            body,
            form_fields,
        })
    }

    /// Whether every declared clause holds for `request`.
    pub fn matches(&self, request: &RecordedRequest) -> bool {
        if let Some(ref method) = self.method {
            if !request.method.eq_ignore_ascii_case(method) {
                return false;
            }
        }

        if let Some(ref url) = self.url {
            if !url.is_satisfied_by(&request.url()) {
                return false;
            }
        }

        for (name, matcher) in &self.headers {
            match request.header(name) {
                Some(value) if matcher.is_satisfied_by(value) => {}
                _ => return false,
            }
        }

        if let Some(ref body) = self.body {
            if !body.is_satisfied_by(&request.body) {
                return false;
            }
        }

        if !self.form_fields.is_empty() {
            let fields = request.form_fields();
            for (name, matcher) in &self.form_fields {
                let satisfied = fields
                    .iter()
                    .find(|(field, _)| field == name)
                    .is_some_and(|(_, value)| matcher.is_satisfied_by(value));
                if !satisfied {
                    return false;
                }
            }
        }

        true
    }

    /// Capture groups of the url clause against `request`.
    pub fn url_captures(&self, request: &RecordedRequest) -> Vec<String> {
        self.url
            .as_ref()
            .map(|m| m.captures(&request.url()))
            .unwrap_or_default()
    }

    /// Capture groups of the body clause against `request`.
    pub fn body_captures(&self, request: &RecordedRequest) -> Vec<String> {
        self.body
            .as_ref()
            .map(|m| m.captures(&request.body))
            .unwrap_or_default()
    }
}

/// Whether `request` satisfies `expectation`, including its scenario precondition.
///
/// Reading scenario state here never creates or changes it.
pub fn expectation_matches(
    request: &RecordedRequest,
    expectation: &Expectation,
    scenarios: &ScenarioStore,
) -> bool {
    if let Some(scenario) = expectation.scenario() {
        if let Some(ref required) = scenario.state_is {
            if scenarios.get_state(&scenario.name) != *required {
                return false;
            }
        }
    }
    expectation.predicate().matches(request)
}
