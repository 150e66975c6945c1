use super::{MockReply, StrategyError};
use crate::expectation::{Expectation, ResponseRecipe, StaticResponse};
use crate::history::RecordedRequest;
use async_trait::async_trait;

/// Builds the reply for a matched expectation.
///
/// Strategies run outside the dispatch lock and may block on I/O. They receive
/// their own copy of the expectation and never touch the stores.
#[async_trait]
pub trait ResponseStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn build(
        &self,
        expectation: &Expectation,
        request: &RecordedRequest,
    ) -> Result<MockReply, StrategyError>;
}

pub(crate) fn static_recipe(expectation: &Expectation) -> Result<&StaticResponse, StrategyError> {
    match expectation.recipe() {
        ResponseRecipe::Static(response) => Ok(response),
        other => Err(StrategyError::InvalidResponse(format!(
            "expected a static response, found {other:?}"
        ))),
    }
}
