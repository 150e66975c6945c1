//! Response construction for matched expectations.
//!
//! The [`ResponseStrategyLocator`] picks one [`ResponseStrategy`] per
//! expectation from its [`ResponseRecipe`](crate::expectation::ResponseRecipe);
//! the strategy turns the expectation and the request into a [`MockReply`].

mod delayed;
mod fault;
mod locator;
mod proxy;
mod static_body;
mod strategy;
pub mod template;

pub use delayed::DelayedResponseStrategy;
pub use fault::FaultResponseStrategy;
pub use locator::ResponseStrategyLocator;
pub use proxy::ProxyResponseStrategy;
pub use static_body::StaticResponseStrategy;
pub use strategy::ResponseStrategy;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;

/// Bodies longer than this are not written to the log.
const MAX_LOGGED_BODY_LEN: usize = 2000;

/// Outcome of a strategy.
#[derive(Debug)]
pub enum MockReply {
    Respond(Response<Full<Bytes>>),
    /// Close the connection without writing a response
    DropConnection,
}

impl MockReply {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MockReply::Respond(response) => Some(response.status()),
            MockReply::DropConnection => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("upstream request to {url} failed: {source}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("cannot build response: {0}")]
    InvalidResponse(String),
    #[error("cannot create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl StrategyError {
    /// Status returned to the client when a strategy fails.
    pub fn status(&self) -> StatusCode {
        match self {
            StrategyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            StrategyError::InvalidResponse(_) | StrategyError::Client(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Plain-text response with the given status.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn whitespace_runs() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Body as it appears in logs: every whitespace run becomes one space, very
/// long bodies are elided.
pub(crate) fn loggable_body(body: &str) -> Cow<'_, str> {
    if body.len() > MAX_LOGGED_BODY_LEN {
        return Cow::Borrowed("--VERY LONG CONTENTS--");
    }
    whitespace_runs().replace_all(body, " ")
}
