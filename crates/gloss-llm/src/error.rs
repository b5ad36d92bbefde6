//! Error types for guarded provider calls

use crate::context::Interrupt;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute)
/// and [`CircuitBreaker::health_check`](crate::CircuitBreaker::health_check)
///
/// `E` is the wrapped operation's own error type; it is carried unchanged.
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was never attempted
    #[error("circuit '{name}' is open, retry after {retry_after:?}")]
    CircuitOpen {
        /// Breaker name
        name: String,
        /// Time left until trial calls are admitted (zero when the
        /// half-open trial slots are merely full)
        retry_after: Duration,
    },

    /// The caller's context was cancelled
    #[error("call cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation finished
    #[error("call deadline exceeded")]
    DeadlineExceeded,

    /// The operation itself failed
    #[error(transparent)]
    Upstream(E),
}

impl<E> BreakerError<E> {
    /// True when the call was rejected without running
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, BreakerError::CircuitOpen { .. })
    }

    /// True for cancellation and deadline expiry
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BreakerError::Cancelled | BreakerError::DeadlineExceeded)
    }

    /// The operation's own error, if that is what this is
    pub fn into_upstream(self) -> Option<E> {
        match self {
            BreakerError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<Interrupt> for BreakerError<E> {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => BreakerError::Cancelled,
            Interrupt::DeadlineExceeded => BreakerError::DeadlineExceeded,
        }
    }
}

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}
