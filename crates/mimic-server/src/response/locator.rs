use super::{
    DelayedResponseStrategy, FaultResponseStrategy, ProxyResponseStrategy, ResponseStrategy,
    StaticResponseStrategy, StrategyError,
};
use crate::expectation::{Expectation, ResponseRecipe};

/// Selects the strategy for an expectation from its recipe.
///
/// Validation guarantees every expectation has exactly one recipe, so
/// selection is a plain mapping.
#[derive(Debug, Clone)]
pub struct ResponseStrategyLocator {
    static_response: StaticResponseStrategy,
    delayed: DelayedResponseStrategy,
    proxy: ProxyResponseStrategy,
    fault: FaultResponseStrategy,
}

impl ResponseStrategyLocator {
    pub fn new() -> Result<Self, StrategyError> {
        Ok(Self::with_proxy(ProxyResponseStrategy::new()?))
    }

    pub fn with_proxy(proxy: ProxyResponseStrategy) -> Self {
        Self {
            static_response: StaticResponseStrategy,
            delayed: DelayedResponseStrategy::default(),
            proxy,
            fault: FaultResponseStrategy,
        }
    }

    pub fn locate(&self, expectation: &Expectation) -> &dyn ResponseStrategy {
        match expectation.recipe() {
            ResponseRecipe::Static(response) if response.delay_millis > 0 => &self.delayed,
            ResponseRecipe::Static(_) => &self.static_response,
            ResponseRecipe::Proxy(_) => &self.proxy,
            ResponseRecipe::Fault { .. } => &self.fault,
        }
    }
}
