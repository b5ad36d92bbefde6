//! Gloss Domain Layer
//!
//! Value types and trait interfaces shared by every other Gloss crate.
//!
//! ## Key Concepts
//!
//! - **Records**: typed values recovered from model output (entities,
//!   relationships, classifications, summaries, keywords)
//! - **Skip audit**: items that parsed but failed a domain rule
//! - **Taxonomy**: the system allow-lists for entity, relationship and
//!   memory types
//! - **Provider**: the boundary to a remote text-generation service
//!
//! ## Architecture
//!
//! Pure data and traits only. Infrastructure (the circuit breaker, concrete
//! providers) and application logic (segmenting, parsing) live in other crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod records;
pub mod taxonomy;
pub mod traits;

// Re-exports for convenience
pub use records::{
    ClassificationRecord, EntityRecord, KeywordRecord, RelationshipRecord, SkipDomain,
    SkipReason, SkippedRecord, SummaryRecord,
};
pub use taxonomy::{MemoryType, Priority, ENTITY_TYPES, RELATIONSHIP_TYPES};
pub use traits::{ExtractionTask, LlmProvider};
