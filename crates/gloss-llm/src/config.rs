//! Configuration for the circuit breaker

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`CircuitBreaker`](crate::CircuitBreaker)
///
/// # Examples
///
/// ```
/// use gloss_llm::BreakerConfig;
///
/// let config = BreakerConfig::default();
/// assert_eq!(config.max_failures, 3);
/// assert_eq!(config.open_timeout().as_secs(), 30);
/// assert_eq!(config.half_open_max_successes, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Name used in logs and open-circuit errors
    pub name: String,

    /// Consecutive failures in Closed state that trip the breaker
    pub max_failures: u32,

    /// How long the breaker stays Open before admitting trial calls (milliseconds)
    pub open_timeout_ms: u64,

    /// Consecutive half-open successes needed to close again. Also caps the
    /// number of concurrent trial calls.
    pub half_open_max_successes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            name: "llm".to_string(),
            max_failures: 3,
            open_timeout_ms: 30_000,
            half_open_max_successes: 2,
        }
    }
}

impl BreakerConfig {
    /// Default configuration with the given breaker name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Aggressive preset: trips on the second failure, retries after 10s
    pub fn aggressive() -> Self {
        Self {
            max_failures: 2,
            open_timeout_ms: 10_000,
            half_open_max_successes: 1,
            ..Self::default()
        }
    }

    /// Lenient preset: tolerates bursts, waits a minute before probing
    pub fn lenient() -> Self {
        Self {
            max_failures: 10,
            open_timeout_ms: 60_000,
            half_open_max_successes: 3,
            ..Self::default()
        }
    }

    /// Get the open timeout as a Duration
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_failures == 0 {
            return Err("max_failures must be greater than 0".to_string());
        }
        if self.open_timeout_ms == 0 {
            return Err("open_timeout_ms must be greater than 0".to_string());
        }
        if self.half_open_max_successes == 0 {
            return Err("half_open_max_successes must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Raise zero thresholds to 1.
    ///
    /// A zero `half_open_max_successes` would admit no trial call and leave
    /// the breaker half-open forever; a zero `max_failures` would open it
    /// before any call ran.
    pub fn clamped(mut self) -> Self {
        self.max_failures = self.max_failures.max(1);
        self.half_open_max_successes = self.half_open_max_successes.max(1);
        self
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
