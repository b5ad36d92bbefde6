//! Circuit breaker guarding remote provider calls
//!
//! # States
//!
//! ```text
//! Closed ──max_failures consecutive failures──▶ Open
//! Open ──open_timeout elapsed (checked on next call)──▶ HalfOpen
//! HalfOpen ──half_open_max_successes consecutive successes──▶ Closed
//! HalfOpen ──any failure──▶ Open (timeout restarts)
//! ```
//!
//! All counters and the state live behind one mutex, so concurrent outcomes
//! cannot interleave and [`CircuitBreaker::metrics`] is always a single
//! consistent snapshot. The lock is never held across an `.await`.
//!
//! There is no timer task: the Open → HalfOpen transition happens lazily when
//! the next call arrives.

use crate::config::BreakerConfig;
use crate::context::CallContext;
use crate::error::BreakerError;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Remote side assumed down, calls fail fast
    Open,
    /// Cooling down is over, a few trial calls are let through
    HalfOpen,
}

impl CircuitState {
    /// Get the state label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of breaker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreakerMetrics {
    /// Calls admitted over the breaker's lifetime (rejections excluded)
    pub total_requests: u64,
    /// Admitted calls that succeeded
    pub total_successes: u64,
    /// Admitted calls that failed, were cancelled, or were dropped
    pub total_failures: u64,
    /// Successes in a row within the current state
    pub consecutive_successes: u32,
    /// Failures in a row within the current state
    pub consecutive_failures: u32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Bumped on every transition; outcomes from an older generation only
    /// touch the lifetime totals.
    generation: u64,
    opened_at: Option<Instant>,
    trials_in_flight: u32,
    metrics: BreakerMetrics,
}

/// Circuit breaker for a single provider client
///
/// # Examples
///
/// ```
/// use gloss_llm::{BreakerConfig, CallContext, CircuitBreaker, CircuitState};
///
/// # async fn example() {
/// let breaker = CircuitBreaker::new(BreakerConfig::default());
/// let ctx = CallContext::new();
///
/// let answer: Result<u32, _> = breaker
///     .execute(&ctx, || async { Ok::<_, std::io::Error>(42) })
///     .await;
///
/// assert_eq!(answer.unwrap(), 42);
/// assert_eq!(breaker.state(), CircuitState::Closed);
/// # }
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

/// Admission ticket for one call. Dropping it records the outcome, so a call
/// whose future is dropped mid-flight counts as a failure and gives its
/// half-open trial slot back.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
    success: bool,
}

impl Permit<'_> {
    fn succeed(mut self) {
        self.success = true;
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.breaker
            .record_outcome(self.generation, self.trial, self.success);
    }
}

impl CircuitBreaker {
    /// Create a new breaker in the Closed state.
    ///
    /// Zero thresholds are raised to 1 (see [`BreakerConfig::clamped`]).
    pub fn new(config: BreakerConfig) -> Self {
        if let Err(reason) = config.validate() {
            warn!(breaker = %config.name, %reason, "breaker config out of range, zero thresholds raised to 1");
        }
        let config = config.clamped();
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                opened_at: None,
                trials_in_flight: 0,
                metrics: BreakerMetrics::default(),
            }),
        }
    }

    /// Breaker name from the configuration
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration this breaker was built with
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state.
    ///
    /// This is a pure read: an Open breaker whose timeout has elapsed still
    /// reports Open until the next call moves it to HalfOpen.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consistent snapshot of all counters
    pub fn metrics(&self) -> BreakerMetrics {
        self.lock().metrics
    }

    /// Run `operation` under the breaker.
    ///
    /// Returns [`BreakerError::CircuitOpen`] without calling `operation` when
    /// the breaker is open (or the half-open trial slots are full). A context
    /// that is already done counts as a failure and `operation` is not called.
    /// Otherwise the operation races the context; any error, including an
    /// interruption, counts against the circuit.
    pub async fn execute<T, E, F, Fut>(
        &self,
        ctx: &CallContext,
        operation: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.admit::<E>()?;

        if let Some(interrupt) = ctx.interrupted() {
            debug!(breaker = %self.config.name, %interrupt, "context done before dispatch");
            return Err(interrupt.into());
        }

        let result = tokio::select! {
            biased;
            interrupt = ctx.done() => Err(BreakerError::from(interrupt)),
            result = operation() => result.map_err(BreakerError::Upstream),
        };

        if result.is_ok() {
            permit.succeed();
        }
        result
    }

    /// Run a health check without any breaker bookkeeping.
    ///
    /// The check runs even when the breaker is open. Returns the check's own
    /// error, or an interruption if the context finishes first.
    pub async fn health_check<T, E, Fut>(
        &self,
        ctx: &CallContext,
        check: Fut,
    ) -> Result<T, BreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(interrupt) = ctx.interrupted() {
            return Err(interrupt.into());
        }

        let result = tokio::select! {
            biased;
            interrupt = ctx.done() => Err(BreakerError::from(interrupt)),
            result = check => result.map_err(BreakerError::Upstream),
        };

        debug!(breaker = %self.config.name, healthy = result.is_ok(), "health check finished");
        result
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters are updated in whole steps under the lock, so a poisoned
        // guard still holds a coherent snapshot.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit<E>(&self) -> Result<Permit<'_>, BreakerError<E>> {
        let mut inner = self.lock();
        let now = Instant::now();

        if inner.state == CircuitState::Open {
            let opened_at = inner.opened_at.unwrap_or(now);
            let reopen_at = opened_at + self.config.open_timeout();
            if now < reopen_at {
                debug!(breaker = %self.config.name, "circuit open, rejecting call");
                return Err(BreakerError::CircuitOpen {
                    name: self.config.name.clone(),
                    retry_after: reopen_at - now,
                });
            }
            self.transition(&mut inner, CircuitState::HalfOpen, now);
        }

        let trial = inner.state == CircuitState::HalfOpen;
        if trial {
            if inner.trials_in_flight >= self.config.half_open_max_successes {
                debug!(breaker = %self.config.name, "half-open trial slots full, rejecting call");
                return Err(BreakerError::CircuitOpen {
                    name: self.config.name.clone(),
                    retry_after: Duration::ZERO,
                });
            }
            inner.trials_in_flight += 1;
        }

        inner.metrics.total_requests += 1;
        Ok(Permit {
            breaker: self,
            generation: inner.generation,
            trial,
            success: false,
        })
    }

    fn record_outcome(&self, generation: u64, trial: bool, success: bool) {
        let mut inner = self.lock();

        if success {
            inner.metrics.total_successes += 1;
        } else {
            inner.metrics.total_failures += 1;
        }

        if generation != inner.generation {
            debug!(breaker = %self.config.name, success, "outcome from a previous state ignored");
            return;
        }
        if trial {
            inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
        }

        let now = Instant::now();
        match (inner.state, success) {
            (CircuitState::Closed, true) => {
                inner.metrics.consecutive_successes += 1;
                inner.metrics.consecutive_failures = 0;
            }
            (CircuitState::Closed, false) => {
                inner.metrics.consecutive_failures += 1;
                inner.metrics.consecutive_successes = 0;
                if inner.metrics.consecutive_failures >= self.config.max_failures {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, true) => {
                inner.metrics.consecutive_successes += 1;
                inner.metrics.consecutive_failures = 0;
                if inner.metrics.consecutive_successes >= self.config.half_open_max_successes {
                    self.transition(&mut inner, CircuitState::Closed, now);
                }
            }
            (CircuitState::HalfOpen, false) => {
                self.transition(&mut inner, CircuitState::Open, now);
            }
            // Open admits nothing, so a same-generation outcome cannot land here.
            (CircuitState::Open, _) => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        let failures = inner.metrics.consecutive_failures;

        inner.state = to;
        inner.generation += 1;
        inner.trials_in_flight = 0;
        inner.metrics.consecutive_failures = 0;
        inner.metrics.consecutive_successes = 0;
        inner.opened_at = (to == CircuitState::Open).then_some(now);

        match to {
            CircuitState::Open => warn!(
                breaker = %self.config.name,
                %from,
                consecutive_failures = failures,
                open_timeout_ms = self.config.open_timeout_ms,
                "circuit opened"
            ),
            CircuitState::HalfOpen => info!(breaker = %self.config.name, %from, "circuit half-open, probing"),
            CircuitState::Closed => info!(breaker = %self.config.name, %from, "circuit closed"),
        }
    }
}
