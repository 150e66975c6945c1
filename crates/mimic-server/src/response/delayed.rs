use super::static_body::StaticResponseStrategy;
use super::strategy::{static_recipe, ResponseStrategy};
use super::{MockReply, StrategyError};
use crate::expectation::Expectation;
use crate::history::RecordedRequest;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Static response sent after waiting `delayMillis`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelayedResponseStrategy {
    inner: StaticResponseStrategy,
}

#[async_trait]
impl ResponseStrategy for DelayedResponseStrategy {
    fn name(&self) -> &'static str {
        "delayed"
    }

    async fn build(
        &self,
        expectation: &Expectation,
        request: &RecordedRequest,
    ) -> Result<MockReply, StrategyError> {
        let response = static_recipe(expectation)?;
        debug!("Delaying response for {} ms", response.delay_millis);
        tokio::time::sleep(Duration::from_millis(response.delay_millis)).await;
        self.inner
            .render(response, expectation, request)
            .map(MockReply::Respond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::StaticResponse;
    use std::time::Instant;

    #[tokio::test]
    async fn test_delayed_response_waits() {
        let expectation = Expectation::builder()
            .response(StaticResponse::new(202).with_delay(50))
            .build()
            .unwrap();

        let start = Instant::now();
        let reply = DelayedResponseStrategy::default()
            .build(&expectation, &RecordedRequest::new("GET", "/"))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(reply.status(), Some(hyper::StatusCode::ACCEPTED));
    }
}
