//! Gloss LLM Provider Layer
//!
//! Failure isolation for remote text-generation calls.
//!
//! # Architecture
//!
//! ```text
//! caller ─▶ GuardedProvider ─▶ CircuitBreaker::execute ─▶ LlmProvider::complete
//! ```
//!
//! - [`CircuitBreaker`]: closed / open / half-open state machine with
//!   lifetime and consecutive counters
//! - [`CallContext`]: cancellation token plus optional deadline, raced
//!   against every guarded call
//! - [`GuardedProvider`]: one provider client and its breaker
//! - [`MockProvider`]: deterministic provider for tests
//!
//! Retries are deliberately absent; a caller that wants them re-invokes
//! [`GuardedProvider::complete`].
//!
//! # Examples
//!
//! ```
//! use gloss_domain::{ExtractionTask, LlmProvider};
//! use gloss_llm::MockProvider;
//!
//! # async fn example() {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.complete(ExtractionTask::Summary, "text").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod breaker;
pub mod config;
pub mod context;
pub mod error;
pub mod guarded;

use gloss_domain::traits::{ExtractionTask, LlmProvider};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use breaker::{BreakerMetrics, CircuitBreaker, CircuitState};
pub use config::BreakerConfig;
pub use context::{CallContext, Interrupt};
pub use error::{BreakerError, LlmError};
pub use guarded::GuardedProvider;

#[derive(Debug, Default)]
struct MockState {
    task_responses: HashMap<ExtractionTask, String>,
    scripted: VecDeque<Result<String, LlmError>>,
    seen: Vec<String>,
    latency: Option<Duration>,
    unhealthy: bool,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Scripted outcomes are consumed first (FIFO), then per-task responses,
/// then the default response.
///
/// # Examples
///
/// ```
/// use gloss_domain::{ExtractionTask, LlmProvider};
/// use gloss_llm::MockProvider;
///
/// # async fn example() {
/// let provider = MockProvider::new("fallback");
/// provider.set_task_response(ExtractionTask::Keywords, r#"{"keywords":["a"]}"#);
/// provider.fail_next(1);
///
/// assert!(provider.complete(ExtractionTask::Keywords, "x").await.is_err());
/// assert_eq!(provider.complete(ExtractionTask::Keywords, "x").await.unwrap(), r#"{"keywords":["a"]}"#);
/// assert_eq!(provider.complete(ExtractionTask::Summary, "x").await.unwrap(), "fallback");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
    call_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all calls
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Respond to every call for `task` with `response`
    pub fn set_task_response(&self, task: ExtractionTask, response: impl Into<String>) {
        self.lock().task_responses.insert(task, response.into());
    }

    /// Queue one outcome to be returned by the next unscripted call
    pub fn push_outcome(&self, outcome: Result<String, LlmError>) {
        self.lock().scripted.push_back(outcome);
    }

    /// Queue one successful response
    pub fn push_response(&self, response: impl Into<String>) {
        self.push_outcome(Ok(response.into()));
    }

    /// Make the next `count` calls fail with a communication error
    pub fn fail_next(&self, count: usize) {
        let mut state = self.lock();
        for _ in 0..count {
            state
                .scripted
                .push_back(Err(LlmError::Communication("mock upstream failure".to_string())));
        }
    }

    /// Delay every call by `latency` before answering
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Control what the health check reports
    pub fn set_healthy(&self, healthy: bool) {
        self.lock().unhealthy = !healthy;
    }

    /// Get the number of times `complete` was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// Content passed to each call, in call order
    pub fn seen_contents(&self) -> Vec<String> {
        self.lock().seen.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, task: ExtractionTask, content: &str) -> Result<String, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let (latency, outcome) = {
            let mut state = self.lock();
            state.seen.push(content.to_string());
            let outcome = state.scripted.pop_front().unwrap_or_else(|| {
                Ok(state
                    .task_responses
                    .get(&task)
                    .cloned()
                    .unwrap_or_else(|| self.default_response.clone()))
            });
            (state.latency, outcome)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }

    async fn health(&self) -> Result<(), LlmError> {
        if self.lock().unhealthy {
            return Err(LlmError::Communication("mock provider unhealthy".to_string()));
        }
        Ok(())
    }
}
