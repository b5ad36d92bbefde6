//! Provider client guarded by a circuit breaker

use crate::breaker::{BreakerMetrics, CircuitBreaker, CircuitState};
use crate::config::BreakerConfig;
use crate::context::CallContext;
use crate::error::BreakerError;
use gloss_domain::traits::{ExtractionTask, LlmProvider};
use tracing::debug;

/// A provider paired with the breaker that protects it
///
/// One `GuardedProvider` per provider client; share it (e.g. behind an
/// `Arc`) across every task that talks to the same remote service so they
/// all see the same circuit.
///
/// # Examples
///
/// ```
/// use gloss_domain::ExtractionTask;
/// use gloss_llm::{BreakerConfig, CallContext, GuardedProvider, MockProvider};
///
/// # async fn example() {
/// let guarded = GuardedProvider::new(MockProvider::new(r#"{"keywords":["rust"]}"#), BreakerConfig::default());
/// let raw = guarded
///     .complete(&CallContext::new(), ExtractionTask::Keywords, "Rust is fast.")
///     .await
///     .unwrap();
/// assert!(raw.contains("rust"));
/// # }
/// ```
#[derive(Debug)]
pub struct GuardedProvider<P> {
    provider: P,
    breaker: CircuitBreaker,
}

impl<P: LlmProvider> GuardedProvider<P> {
    /// Wrap `provider` with a fresh breaker built from `config`
    pub fn new(provider: P, config: BreakerConfig) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::new(config),
        }
    }

    /// Run one provider call through the breaker
    pub async fn complete(
        &self,
        ctx: &CallContext,
        task: ExtractionTask,
        content: &str,
    ) -> Result<String, BreakerError<P::Error>> {
        debug!(
            provider = self.provider.name(),
            task = task.as_str(),
            content_chars = content.chars().count(),
            "dispatching provider call"
        );
        self.breaker
            .execute(ctx, || self.provider.complete(task, content))
            .await
    }

    /// Check the provider without touching the breaker's counters
    pub async fn health_check(&self, ctx: &CallContext) -> Result<(), BreakerError<P::Error>> {
        self.breaker.health_check(ctx, self.provider.health()).await
    }

    /// Current breaker state
    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Breaker counter snapshot
    pub fn metrics(&self) -> BreakerMetrics {
        self.breaker.metrics()
    }

    /// The underlying breaker
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmError, MockProvider};

    #[tokio::test]
    async fn test_failures_trip_the_guard() {
        let mock = MockProvider::new("{}");
        mock.fail_next(3);
        let guarded = GuardedProvider::new(mock.clone(), BreakerConfig::default());
        let ctx = CallContext::new();

        for _ in 0..3 {
            let err = guarded
                .complete(&ctx, ExtractionTask::Entities, "text")
                .await
                .unwrap_err();
            assert!(matches!(err, BreakerError::Upstream(LlmError::Communication(_))));
        }
        assert_eq!(guarded.state(), CircuitState::Open);

        let err = guarded
            .complete(&ctx, ExtractionTask::Entities, "text")
            .await
            .unwrap_err();
        assert!(err.is_circuit_open());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_health_check_leaves_metrics_alone() {
        let guarded = GuardedProvider::new(MockProvider::new("{}"), BreakerConfig::default());
        guarded.health_check(&CallContext::new()).await.unwrap();
        assert_eq!(guarded.metrics(), BreakerMetrics::default());
    }

    #[tokio::test]
    async fn test_unhealthy_provider_reports_its_error() {
        let mock = MockProvider::new("{}");
        mock.set_healthy(false);
        let guarded = GuardedProvider::new(mock, BreakerConfig::default());

        let err = guarded.health_check(&CallContext::new()).await.unwrap_err();
        assert!(matches!(err, BreakerError::Upstream(LlmError::Communication(_))));
        assert_eq!(guarded.state(), CircuitState::Closed);
    }
}
