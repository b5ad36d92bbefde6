//! Trait definitions for external interactions
//!
//! These traits define the boundary between the enrichment core and the
//! provider adapters that talk to a concrete vendor endpoint. Adapters live
//! outside this workspace; `gloss-llm` ships a mock for tests.

use std::future::Future;

/// Shape of record a provider call is expected to produce
///
/// The adapter maps each task to its own prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionTask {
    /// `{"entities": [...]}`
    Entities,
    /// `{"relationships": [...]}`
    Relationships,
    /// A single classification object
    Classification,
    /// `{"summary": "...", "key_points": [...]}`
    Summary,
    /// `{"keywords": [...]}`
    Keywords,
}

impl ExtractionTask {
    /// Get the task name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionTask::Entities => "entities",
            ExtractionTask::Relationships => "relationships",
            ExtractionTask::Classification => "classification",
            ExtractionTask::Summary => "summary",
            ExtractionTask::Keywords => "keywords",
        }
    }
}

/// Trait for text-generation providers
///
/// One call is one remote request: the provider renders the prompt for
/// `task`, sends it with `content`, and returns the raw text answer. It must
/// not retry internally.
pub trait LlmProvider: Send + Sync {
    /// Error type for provider operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short provider name for logs (e.g. "ollama", "mock")
    fn name(&self) -> &str;

    /// Run `task` against `content` and return the raw model output
    fn complete(
        &self,
        task: ExtractionTask,
        content: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Cheap reachability check. Providers without one report healthy.
    fn health(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async { Ok(()) }
    }
}
