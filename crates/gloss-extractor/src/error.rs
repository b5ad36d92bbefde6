//! Error types for the Extractor

use gloss_llm::{BreakerError, Interrupt};
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during parsing and extraction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    /// Response text held no parseable JSON of the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response parsed but the record as a whole failed validation
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The provider's circuit is open
    #[error("Circuit '{name}' is open, retry after {retry_after:?}")]
    CircuitOpen {
        /// Breaker name
        name: String,
        /// Time left until trial calls are admitted
        retry_after: Duration,
    },

    /// The caller cancelled the operation
    #[error("Extraction cancelled")]
    Cancelled,

    /// A deadline passed before the provider answered
    #[error("Extraction deadline exceeded")]
    DeadlineExceeded,

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Nothing to extract from
    #[error("Input text is empty")]
    EmptyInput,

    /// Every chunk of a multi-chunk extraction failed
    #[error("All {chunks} chunks failed; last error: {last_error}")]
    NoChunkSucceeded {
        /// Number of chunks attempted
        chunks: usize,
        /// Reason the last chunk failed
        last_error: String,
    },
}

impl ExtractorError {
    /// True for errors after which further provider calls are pointless
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExtractorError::CircuitOpen { .. }
                | ExtractorError::Cancelled
                | ExtractorError::Config(_)
        )
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::MalformedResponse(e.to_string())
    }
}

impl From<Interrupt> for ExtractorError {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => ExtractorError::Cancelled,
            Interrupt::DeadlineExceeded => ExtractorError::DeadlineExceeded,
        }
    }
}

impl<E: Display> From<BreakerError<E>> for ExtractorError {
    fn from(e: BreakerError<E>) -> Self {
        match e {
            BreakerError::CircuitOpen { name, retry_after } => {
                ExtractorError::CircuitOpen { name, retry_after }
            }
            BreakerError::Cancelled => ExtractorError::Cancelled,
            BreakerError::DeadlineExceeded => ExtractorError::DeadlineExceeded,
            BreakerError::Upstream(e) => ExtractorError::Llm(e.to_string()),
        }
    }
}
