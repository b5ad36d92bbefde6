//! Configuration for the Extractor

use gloss_domain::{ENTITY_TYPES, RELATIONSHIP_TYPES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
///
/// # Examples
///
/// ```
/// use gloss_extractor::ExtractorConfig;
///
/// let config = ExtractorConfig::from_toml(r#"
/// max_chunk_tokens = 1000
/// extended_entity_types = ["crate"]
/// "#).unwrap();
/// assert_eq!(config.overlap_tokens, 200);
/// assert!(config.entity_types().contains(&"crate"));
/// assert!(config.entity_types().contains(&"person"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Token budget per chunk sent to the provider
    pub max_chunk_tokens: usize,

    /// Tokens of trailing context repeated at the start of the next chunk
    pub overlap_tokens: usize,

    /// Maximum time for a single provider call (seconds)
    pub call_timeout_secs: u64,

    /// Entity types accepted in addition to the system taxonomy
    pub extended_entity_types: Vec<String>,

    /// Relationship types accepted in addition to the system taxonomy
    pub extended_relationship_types: Vec<String>,
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_chunk_tokens: 3000,
            overlap_tokens: 200,
            call_timeout_secs: 120,
            extended_entity_types: Vec::new(),
            extended_relationship_types: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: small chunks and short timeouts for fast turnaround
    pub fn aggressive() -> Self {
        Self {
            max_chunk_tokens: 1000,
            overlap_tokens: 50,
            call_timeout_secs: 30,
            ..Self::default()
        }
    }

    /// Lenient preset: large chunks and long timeouts for better context
    pub fn lenient() -> Self {
        Self {
            max_chunk_tokens: 8000,
            overlap_tokens: 500,
            call_timeout_secs: 300,
            ..Self::default()
        }
    }

    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// System entity types followed by the extended ones
    pub fn entity_types(&self) -> Vec<&str> {
        merge_types(ENTITY_TYPES, &self.extended_entity_types)
    }

    /// System relationship types followed by the extended ones
    pub fn relationship_types(&self) -> Vec<&str> {
        merge_types(RELATIONSHIP_TYPES, &self.extended_relationship_types)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_tokens == 0 {
            return Err("max_chunk_tokens must be greater than 0".to_string());
        }
        if self.overlap_tokens >= self.max_chunk_tokens {
            return Err("overlap_tokens must be less than max_chunk_tokens".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        if let Some(blank) = self
            .extended_entity_types
            .iter()
            .chain(&self.extended_relationship_types)
            .find(|t| t.trim().is_empty())
        {
            return Err(format!("extended type '{}' is blank", blank));
        }
        Ok(())
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

fn merge_types<'a>(system: &[&'a str], extended: &'a [String]) -> Vec<&'a str> {
    let mut types = system.to_vec();
    for extra in extended.iter().map(|t| t.as_str()) {
        if !types.iter().any(|t| t.eq_ignore_ascii_case(extra)) {
            types.push(extra);
        }
    }
    types
}
