//! Ordered lists of interchangeable extraction strategies.
//!
//! A [`StrategyChain`] tries each [`Strategy`] in order and returns the
//! first result with non-blank text. Errors and blank results are recorded
//! as [`StrategyFailure`]s so the caller can report every attempt.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use content_intake_core::StrategyFailure;

use super::Extracted;

/// One concrete way of turning an input into text.
#[async_trait]
pub trait Strategy<I: ?Sized + Sync>: Send + Sync {
    /// Short identifier recorded in metadata and failure reports.
    fn name(&self) -> &str;

    async fn extract(&self, input: &I) -> anyhow::Result<Extracted>;
}

/// Strategies for one input type, in priority order.
pub struct StrategyChain<I: ?Sized + Sync> {
    strategies: Vec<Arc<dyn Strategy<I>>>,
}

impl<I: ?Sized + Sync> Clone for StrategyChain<I> {
    fn clone(&self) -> Self {
        Self {
            strategies: self.strategies.clone(),
        }
    }
}

impl<I: ?Sized + Sync> Default for StrategyChain<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized + Sync> StrategyChain<I> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy after the existing ones.
    pub fn push(mut self, strategy: impl Strategy<I> + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Runs strategies until one yields non-blank text.
    ///
    /// The winning strategy's name is stored under the `strategy` metadata
    /// key. On total failure every attempt is returned in order.
    pub async fn run(&self, input: &I) -> Result<Extracted, Vec<StrategyFailure>> {
        let mut failures = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.extract(input).await {
                Ok(mut extracted) if !extracted.text.trim().is_empty() => {
                    debug!(strategy = strategy.name(), "extraction strategy succeeded");
                    extracted
                        .metadata
                        .insert("strategy".to_string(), strategy.name().to_string());
                    return Ok(extracted);
                }
                Ok(_) => {
                    warn!(strategy = strategy.name(), "extraction strategy returned no text");
                    failures.push(StrategyFailure::new(strategy.name(), "no text extracted"));
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "extraction strategy failed");
                    failures.push(StrategyFailure::new(strategy.name(), format!("{:#}", e)));
                }
            }
        }
        Err(failures)
    }
}
