//! Gloss Extractor
//!
//! Turns free text into validated, typed records using a remote language
//! model behind a circuit breaker.
//!
//! # Architecture
//!
//! ```text
//! Text → TextSegmenter → GuardedProvider → raw text → parser → records
//! ```
//!
//! - [`TextSegmenter`] splits large inputs into sentence-aligned chunks that
//!   fit an estimated token budget, with overlap between neighbours.
//! - The [`parser`] recovers JSON from chatty model output and validates it:
//!   batch items that fail a domain rule, or do not have the expected shape,
//!   are moved to a skip list instead of failing the call.
//! - [`Extractor`] drives both over a [`GuardedProvider`](gloss_llm::GuardedProvider),
//!   merging per-chunk results.
//!
//! # Example Usage
//!
//! ```
//! use gloss_extractor::{Extractor, ExtractorConfig};
//! use gloss_llm::{BreakerConfig, CallContext, MockProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(
//!     r#"{"entities":[{"name":"Alice","type":"person","confidence":0.9}]}"#,
//! );
//! let extractor = Extractor::new(llm, BreakerConfig::default(), ExtractorConfig::default())?;
//!
//! let result = extractor
//!     .extract_entities(&CallContext::new(), "Alice works at Acme Corp.")
//!     .await?;
//!
//! println!("Kept: {} entities", result.items.len());
//! println!("Skipped: {} entities", result.skipped.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod chunking;
pub mod config;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod types;


pub use chunking::{estimate_tokens, segment, TextSegmenter};
pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use parser::{
    extract_json, parse_classification, parse_entities, parse_keywords, parse_relationships,
    parse_summary,
};
pub use types::{
    ChunkFailure, EntityExtraction, Extraction, ExtractionMetadata, RelationshipExtraction,
    ValidatedBatch,
};
