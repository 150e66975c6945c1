use super::strategy::{static_recipe, ResponseStrategy};
use super::template::{process_template, TemplateContext};
use super::{loggable_body, MockReply, StrategyError};
use crate::expectation::{Expectation, ResponseEncoding, StaticResponse};
use crate::history::RecordedRequest;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use tracing::debug;

/// Fixed status, headers and body, with request templating.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticResponseStrategy;

impl StaticResponseStrategy {
    pub fn render(
        &self,
        response: &StaticResponse,
        expectation: &Expectation,
        request: &RecordedRequest,
    ) -> Result<Response<Full<Bytes>>, StrategyError> {
        let context = TemplateContext::new(request, expectation.predicate());

        let body = match response.encoding {
            ResponseEncoding::Text => Bytes::from(process_template(&response.body_text(), &context)),
            ResponseEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(response.body_text())
                .map(Bytes::from)
                .map_err(|e| StrategyError::InvalidResponse(format!("invalid base64 body: {e}")))?,
        };

        let status = StatusCode::from_u16(response.status_code).map_err(|_| {
            StrategyError::InvalidResponse(format!("invalid status code {}", response.status_code))
        })?;

        let mut builder = Response::builder().status(status);
        for (name, value) in &response.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| StrategyError::InvalidResponse(format!("invalid header name {name}")))?;
            let value = HeaderValue::from_str(&process_template(value, &context)).map_err(|_| {
                StrategyError::InvalidResponse(format!("invalid value for header {name}"))
            })?;
            builder = builder.header(name, value);
        }

        debug!(
            "Response: {} / {}",
            status.as_u16(),
            loggable_body(&String::from_utf8_lossy(&body))
        );

        builder
            .body(Full::new(body))
            .map_err(|e| StrategyError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ResponseStrategy for StaticResponseStrategy {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn build(
        &self,
        expectation: &Expectation,
        request: &RecordedRequest,
    ) -> Result<MockReply, StrategyError> {
        let response = static_recipe(expectation)?;
        self.render(response, expectation, request)
            .map(MockReply::Respond)
    }
}
