//! Expectation model.
//!
//! An [`Expectation`] pairs a compiled [`RequestPredicate`] with a
//! [`ResponseRecipe`]. It is built from an [`ExpectationDefinition`] (the wire
//! form) and serializes back to one, so listing returns what was registered.

use crate::predicate::{ConditionError, RequestConditions, RequestPredicate};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Default wait before a `timeout` fault closes the connection.
pub const DEFAULT_FAULT_DELAY_MILLIS: u64 = 60_000;

/// Errors for malformed expectation definitions.
#[derive(Debug, Error)]
pub enum ExpectationError {
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error("only one of response, proxyTo and fault may be set")]
    ConflictingResponse,
    #[error("{0} requires scenarioName")]
    MissingScenarioName(&'static str),
    #[error("invalid status code: {0}")]
    InvalidStatusCode(u16),
    #[error("invalid response header name: {0}")]
    InvalidHeaderName(String),
    #[error("response body is not valid base64: {0}")]
    InvalidBase64(#[source] base64::DecodeError),
    #[error("invalid proxyTo URL '{0}': {1}")]
    InvalidProxyTarget(String, String),
    #[error("usageLimit must be at least 1")]
    InvalidUsageLimit,
}

/// Identity assigned by the store when an expectation is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectationId(Uuid);

impl ExpectationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpectationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpectationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ExpectationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Body encoding of a static response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEncoding {
    #[default]
    Text,
    /// Body is base64 and is decoded before sending
    Base64,
}

fn is_text(encoding: &ResponseEncoding) -> bool {
    *encoding == ResponseEncoding::Text
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn default_status_code() -> u16 {
    200
}

/// Accept `statusCode` as a number or a numeric string.
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}

/// Fixed response: status, headers, optional body and delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StaticResponse {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Strings are sent as-is; any other JSON value is sent as compact JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "is_text")]
    pub encoding: ResponseEncoding,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delay_millis: u64,
}

impl Default for StaticResponse {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: BTreeMap::new(),
            body: None,
            encoding: ResponseEncoding::Text,
            delay_millis: 0,
        }
    }
}

impl StaticResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(serde_json::Value::String(body.into()));
        self
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_delay(mut self, delay_millis: u64) -> Self {
        self.delay_millis = delay_millis;
        self
    }

    pub fn base64(mut self) -> Self {
        self.encoding = ResponseEncoding::Base64;
        self
    }

    /// Body as text before templating.
    pub fn body_text(&self) -> String {
        match self.body {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(ref s)) => s.clone(),
            Some(ref other) => other.to_string(),
        }
    }

    fn validate(&self) -> Result<(), ExpectationError> {
        hyper::StatusCode::from_u16(self.status_code)
            .map_err(|_| ExpectationError::InvalidStatusCode(self.status_code))?;
        for name in self.headers.keys() {
            hyper::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ExpectationError::InvalidHeaderName(name.clone()))?;
        }
        if self.encoding == ResponseEncoding::Base64 {
            base64::engine::general_purpose::STANDARD
                .decode(self.body_text())
                .map_err(ExpectationError::InvalidBase64)?;
        }
        Ok(())
    }
}

/// Injected failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultKind {
    /// Close the connection without writing a response
    ConnectionReset,
    /// Wait, then close without a response
    Timeout,
}

/// How a matched expectation produces its response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseRecipe {
    Static(StaticResponse),
    Proxy(reqwest::Url),
    Fault { kind: FaultKind, delay_millis: u64 },
}

/// Scenario clause of an expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioClause {
    pub name: String,
    /// Required current state
    pub state_is: Option<String>,
    /// State to set when the expectation is selected
    pub new_state: Option<String>,
}

/// Wire form of an expectation (JSON / YAML).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpectationDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExpectationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_state_is: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_scenario_state: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub request: RequestConditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<StaticResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_delay_millis: Option<u64>,
}

/// A validated expectation, ready for matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ExpectationDefinition", into = "ExpectationDefinition")]
pub struct Expectation {
    id: Option<ExpectationId>,
    definition: ExpectationDefinition,
    scenario: Option<ScenarioClause>,
    predicate: Arc<RequestPredicate>,
    recipe: ResponseRecipe,
}

impl Expectation {
    pub fn builder() -> ExpectationBuilder {
        ExpectationBuilder::default()
    }

    /// Identity; `None` until the expectation is stored.
    pub fn id(&self) -> Option<ExpectationId> {
        self.id
    }

    pub(crate) fn with_id(mut self, id: ExpectationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn priority(&self) -> i32 {
        self.definition.priority
    }

    pub fn usage_limit(&self) -> Option<u32> {
        self.definition.usage_limit
    }

    pub fn scenario(&self) -> Option<&ScenarioClause> {
        self.scenario.as_ref()
    }

    pub fn predicate(&self) -> &RequestPredicate {
        &self.predicate
    }

    pub fn recipe(&self) -> &ResponseRecipe {
        &self.recipe
    }

    pub fn conditions(&self) -> &RequestConditions {
        &self.definition.request
    }

    /// Wire form including the assigned id.
    pub fn to_definition(&self) -> ExpectationDefinition {
        ExpectationDefinition {
            id: self.id,
            ..self.definition.clone()
        }
    }
}

impl PartialEq for Expectation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.definition == other.definition
    }
}

impl TryFrom<ExpectationDefinition> for Expectation {
    type Error = ExpectationError;

    fn try_from(mut definition: ExpectationDefinition) -> Result<Self, Self::Error> {
        let recipe_count = [
            definition.response.is_some(),
            definition.proxy_to.is_some(),
            definition.fault.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        if recipe_count > 1 {
            return Err(ExpectationError::ConflictingResponse);
        }

        if definition.usage_limit == Some(0) {
            return Err(ExpectationError::InvalidUsageLimit);
        }

        let scenario = match definition.scenario_name {
            Some(ref name) => Some(ScenarioClause {
                name: name.clone(),
                state_is: definition.scenario_state_is.clone(),
                new_state: definition.new_scenario_state.clone(),
            }),
            None if definition.scenario_state_is.is_some() => {
                return Err(ExpectationError::MissingScenarioName("scenarioStateIs"))
            }
            None if definition.new_scenario_state.is_some() => {
                return Err(ExpectationError::MissingScenarioName("newScenarioState"))
            }
            None => None,
        };

        let recipe = if let Some(ref target) = definition.proxy_to {
            let url = reqwest::Url::parse(target)
                .map_err(|e| ExpectationError::InvalidProxyTarget(target.clone(), e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ExpectationError::InvalidProxyTarget(
                    target.clone(),
                    "scheme must be http or https".to_string(),
                ));
            }
            ResponseRecipe::Proxy(url)
        } else if let Some(kind) = definition.fault {
            ResponseRecipe::Fault {
                kind,
                delay_millis: definition
                    .fault_delay_millis
                    .unwrap_or(DEFAULT_FAULT_DELAY_MILLIS),
            }
        } else {
            let response = definition.response.clone().unwrap_or_default();
            response.validate()?;
            ResponseRecipe::Static(response)
        };

        let predicate = RequestPredicate::compile(&definition.request)?;
        let id = definition.id.take();

        Ok(Self {
            id,
            definition,
            scenario,
            predicate: Arc::new(predicate),
            recipe,
        })
    }
}

impl From<Expectation> for ExpectationDefinition {
    fn from(expectation: Expectation) -> Self {
        expectation.to_definition()
    }
}

/// Programmatic construction of expectations.
#[derive(Debug, Default)]
pub struct ExpectationBuilder {
    definition: ExpectationDefinition,
}

impl ExpectationBuilder {
    pub fn priority(mut self, priority: i32) -> Self {
        self.definition.priority = priority;
        self
    }

    pub fn usage_limit(mut self, limit: u32) -> Self {
        self.definition.usage_limit = Some(limit);
        self
    }

    pub fn method(mut self, method: &str) -> Self {
        self.definition.request.method = Some(method.to_string());
        self
    }

    pub fn url(mut self, condition: crate::predicate::MatchCondition) -> Self {
        self.definition.request.url = Some(condition);
        self
    }

    pub fn header(mut self, name: &str, condition: crate::predicate::MatchCondition) -> Self {
        self.definition
            .request
            .headers
            .insert(name.to_string(), condition);
        self
    }

    pub fn body(mut self, condition: crate::predicate::MatchCondition) -> Self {
        self.definition.request.body = Some(condition);
        self
    }

    pub fn scenario(mut self, name: &str, state_is: Option<&str>, new_state: Option<&str>) -> Self {
        self.definition.scenario_name = Some(name.to_string());
        self.definition.scenario_state_is = state_is.map(str::to_string);
        self.definition.new_scenario_state = new_state.map(str::to_string);
        self
    }

    pub fn response(mut self, response: StaticResponse) -> Self {
        self.definition.response = Some(response);
        self
    }

    pub fn proxy_to(mut self, url: &str) -> Self {
        self.definition.proxy_to = Some(url.to_string());
        self
    }

    pub fn fault(mut self, kind: FaultKind, delay_millis: Option<u64>) -> Self {
        self.definition.fault = Some(kind);
        self.definition.fault_delay_millis = delay_millis;
        self
    }

    pub fn build(self) -> Result<Expectation, ExpectationError> {
        Expectation::try_from(self.definition)
    }
}
