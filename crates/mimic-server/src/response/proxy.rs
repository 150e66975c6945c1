use super::strategy::ResponseStrategy;
use super::{loggable_body, MockReply, StrategyError};
use crate::expectation::{Expectation, ResponseRecipe};
use crate::history::RecordedRequest;
use async_trait::async_trait;
use http_body_util::Full;
use hyper::Response;
use std::time::Duration;
use tracing::debug;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_forwardable_request_header(name: &str) -> bool {
    name != "host" && name != "content-length" && !HOP_BY_HOP_HEADERS.contains(&name)
}

fn is_forwardable_response_header(name: &str) -> bool {
    name != "content-length" && !HOP_BY_HOP_HEADERS.contains(&name)
}

/// Forwards the request to the expectation's `proxyTo` URL and relays the answer.
#[derive(Debug, Clone)]
pub struct ProxyResponseStrategy {
    client: reqwest::Client,
}

impl ProxyResponseStrategy {
    pub fn new() -> Result<Self, StrategyError> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(StrategyError::Client)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseStrategy for ProxyResponseStrategy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn build(
        &self,
        expectation: &Expectation,
        request: &RecordedRequest,
    ) -> Result<MockReply, StrategyError> {
        let ResponseRecipe::Proxy(ref target) = *expectation.recipe() else {
            return Err(StrategyError::InvalidResponse(
                "expected a proxy recipe".to_string(),
            ));
        };

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| StrategyError::InvalidResponse(e.to_string()))?;
        debug!("Proxying {} to {}", method, target);

        let mut outbound = self.client.request(method, target.clone());
        for (name, value) in &request.headers {
            if is_forwardable_request_header(name) {
                outbound = outbound.header(name.as_str(), value.as_str());
            }
        }
        if !request.raw_body.is_empty() {
            outbound = outbound.body(request.raw_body.clone());
        }

        let upstream_error = |source| StrategyError::Upstream {
            url: target.to_string(),
            source,
        };
        let upstream = outbound.send().await.map_err(upstream_error)?;

        let status = upstream.status();
        let mut builder = Response::builder().status(status);
        for (name, value) in upstream.headers() {
            if is_forwardable_response_header(name.as_str()) {
                builder = builder.header(name, value);
            }
        }
        let body = upstream.bytes().await.map_err(upstream_error)?;

        debug!(
            "Upstream response: {} / {}",
            status.as_u16(),
            loggable_body(&String::from_utf8_lossy(&body))
        );

        builder
            .body(Full::new(body))
            .map(MockReply::Respond)
            .map_err(|e| StrategyError::InvalidResponse(e.to_string()))
    }
}
