use super::strategy::ResponseStrategy;
use super::{MockReply, StrategyError};
use crate::expectation::{Expectation, FaultKind, ResponseRecipe};
use crate::history::RecordedRequest;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Failure injection: abrupt connection close, or a stall followed by one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultResponseStrategy;

#[async_trait]
impl ResponseStrategy for FaultResponseStrategy {
    fn name(&self) -> &'static str {
        "fault"
    }

    async fn build(
        &self,
        expectation: &Expectation,
        _request: &RecordedRequest,
    ) -> Result<MockReply, StrategyError> {
        let ResponseRecipe::Fault { kind, delay_millis } = *expectation.recipe() else {
            return Err(StrategyError::InvalidResponse(
                "expected a fault recipe".to_string(),
            ));
        };

        match kind {
            FaultKind::ConnectionReset => {
                debug!("Injecting connection reset");
            }
            FaultKind::Timeout => {
                debug!("Injecting timeout of {} ms", delay_millis);
                tokio::time::sleep(Duration::from_millis(delay_millis)).await;
            }
        }
        Ok(MockReply::DropConnection)
    }
}
