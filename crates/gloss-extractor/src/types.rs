//! Result types for parsing and extraction

use gloss_domain::{EntityRecord, RelationshipRecord, SkippedRecord};
use serde::Serialize;

/// Items that passed validation plus the audit of those that did not
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedBatch<T> {
    /// Items that passed every rule, in response order
    pub valid: Vec<T>,

    /// Items that parsed but failed a rule, in response order
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Default for ValidatedBatch<T> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// A chunk whose provider call or parse failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkFailure {
    /// Position of the chunk in the segmented input
    pub index: usize,

    /// Why the chunk produced nothing
    pub reason: String,
}

/// Metadata about an extraction operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionMetadata {
    /// Name of the LLM provider used
    pub provider: String,

    /// Number of chunks the input was split into
    pub chunks_total: usize,

    /// Chunks whose response was parsed
    pub chunks_succeeded: usize,

    /// Chunks that failed, with reasons
    pub chunk_failures: Vec<ChunkFailure>,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Aggregated result of a multi-chunk batch extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction<T> {
    /// Validated, deduplicated items across all chunks
    pub items: Vec<T>,

    /// Skip audit across all chunks
    pub skipped: Vec<SkippedRecord>,

    /// Metadata about the extraction
    pub metadata: ExtractionMetadata,
}

/// Entities extracted from a document
pub type EntityExtraction = Extraction<EntityRecord>;

/// Relationships extracted from a document
pub type RelationshipExtraction = Extraction<RelationshipRecord>;

