//! Core Extractor implementation

use crate::chunking::TextSegmenter;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{
    normalize_keywords, parse_batch, parse_classification, parse_keywords, parse_summary, Screened,
};
use crate::types::{
    ChunkFailure, EntityExtraction, Extraction, ExtractionMetadata, RelationshipExtraction,
};
use gloss_domain::traits::{ExtractionTask, LlmProvider};
use gloss_domain::{
    ClassificationRecord, EntityRecord, KeywordRecord, RelationshipRecord, SummaryRecord,
};
use gloss_llm::{BreakerConfig, CallContext, CircuitState, GuardedProvider};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Turns free text into validated records through a guarded provider
///
/// Batch shapes (entities, relationships, keywords) run over every chunk of
/// the segmented input and are merged. Classification and summary describe
/// the document as a whole and run once, on the leading chunk.
pub struct Extractor<P: LlmProvider> {
    provider: Arc<GuardedProvider<P>>,
    segmenter: TextSegmenter,
    config: ExtractorConfig,
}

impl<P> Extractor<P>
where
    P: LlmProvider,
    P::Error: Display,
{
    /// Create a new Extractor with its own breaker
    pub fn new(
        provider: P,
        breaker: BreakerConfig,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        breaker.validate().map_err(ExtractorError::Config)?;
        Self::with_guarded(Arc::new(GuardedProvider::new(provider, breaker)), config)
    }

    /// Create an Extractor on a guarded provider shared with other callers
    pub fn with_guarded(
        provider: Arc<GuardedProvider<P>>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            provider,
            segmenter: TextSegmenter::new(config.max_chunk_tokens, config.overlap_tokens),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The guarded provider
    pub fn provider(&self) -> &GuardedProvider<P> {
        &self.provider
    }

    /// Current state of the provider's breaker
    pub fn circuit_state(&self) -> CircuitState {
        self.provider.state()
    }

    /// Check the provider's health through its breaker
    pub async fn health_check(&self, ctx: &CallContext) -> Result<(), ExtractorError> {
        Ok(self.provider.health_check(ctx).await?)
    }

    /// Extract entities from every chunk of `content`.
    ///
    /// Entities are merged case-insensitively by name; the most confident
    /// copy wins and keeps the position of the first sighting.
    pub async fn extract_entities(
        &self,
        ctx: &CallContext,
        content: &str,
    ) -> Result<EntityExtraction, ExtractorError> {
        let allowed = self.config.entity_types();
        self.extract_batch::<EntityRecord>(ctx, ExtractionTask::Entities, content, &allowed)
            .await
    }

    /// Extract relationships from every chunk of `content`.
    ///
    /// Relationships are merged on (from, to, type), ignoring case.
    pub async fn extract_relationships(
        &self,
        ctx: &CallContext,
        content: &str,
    ) -> Result<RelationshipExtraction, ExtractorError> {
        let allowed = self.config.relationship_types();
        self.extract_batch::<RelationshipRecord>(
            ctx,
            ExtractionTask::Relationships,
            content,
            &allowed,
        )
        .await
    }

    /// Classify the leading chunk of `content`
    pub async fn classify(
        &self,
        ctx: &CallContext,
        content: &str,
    ) -> Result<ClassificationRecord, ExtractorError> {
        let raw = self
            .call_leading_chunk(ctx, ExtractionTask::Classification, content)
            .await?;
        parse_classification(&raw)
    }

    /// Summarize the leading chunk of `content`
    pub async fn summarize(
        &self,
        ctx: &CallContext,
        content: &str,
    ) -> Result<SummaryRecord, ExtractorError> {
        let raw = self
            .call_leading_chunk(ctx, ExtractionTask::Summary, content)
            .await?;
        parse_summary(&raw)
    }

    /// Extract keywords from every chunk, merged in first-seen order
    pub async fn extract_keywords(
        &self,
        ctx: &CallContext,
        content: &str,
    ) -> Result<KeywordRecord, ExtractorError> {
        let (records, metadata) = self
            .for_each_chunk(ctx, ExtractionTask::Keywords, content, parse_keywords)
            .await?;
        let keywords = normalize_keywords(records.into_iter().flat_map(|r| r.keywords).collect());

        info!(
            "Keyword extraction complete: {} keywords from {}/{} chunks",
            keywords.len(),
            metadata.chunks_succeeded,
            metadata.chunks_total
        );
        Ok(KeywordRecord { keywords })
    }

    async fn extract_batch<T: Screened>(
        &self,
        ctx: &CallContext,
        task: ExtractionTask,
        content: &str,
        allowed: &[&str],
    ) -> Result<Extraction<T>, ExtractorError> {
        let (batches, metadata) = self
            .for_each_chunk(ctx, task, content, |raw| parse_batch::<T>(raw, Some(allowed)))
            .await?;

        let mut items: Vec<T> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();
        for batch in batches {
            for item in batch.valid {
                match positions.entry(item.identity()) {
                    Entry::Occupied(slot) => {
                        let existing = &mut items[*slot.get()];
                        if item.confidence() > existing.confidence() {
                            *existing = item;
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(items.len());
                        items.push(item);
                    }
                }
            }
            skipped.extend(batch.skipped);
        }

        info!(
            "{} extraction complete: {} kept, {} skipped, {}/{} chunks succeeded",
            task.as_str(),
            items.len(),
            skipped.len(),
            metadata.chunks_succeeded,
            metadata.chunks_total
        );

        Ok(Extraction {
            items,
            skipped,
            metadata,
        })
    }

    /// Call the provider for each chunk in order and parse every response.
    ///
    /// A chunk that fails is recorded and skipped. An open circuit marks the
    /// remaining chunks failed and stops the loop. Once `ctx` itself is
    /// cancelled or past its deadline the whole call aborts. Every dispatch
    /// goes through the breaker, so an interrupted caller is charged one
    /// failure and no more. Fails when no chunk produced a parsed result.
    async fn for_each_chunk<T, F>(
        &self,
        ctx: &CallContext,
        task: ExtractionTask,
        content: &str,
        mut parse: F,
    ) -> Result<(Vec<T>, ExtractionMetadata), ExtractorError>
    where
        F: FnMut(&str) -> Result<T, ExtractorError>,
    {
        let start = Instant::now();
        let chunks = self.chunks(content)?;
        if chunks.len() > 1 {
            info!("Input split into {} chunks for {}", chunks.len(), task.as_str());
        }

        let mut parsed = Vec::with_capacity(chunks.len());
        let mut failures = Vec::new();
        let mut last_error = None;

        for (index, chunk) in chunks.iter().enumerate() {
            match self.call(ctx, task, chunk).await.and_then(|raw| parse(&raw)) {
                Ok(value) => {
                    debug!("Chunk {}/{} parsed", index + 1, chunks.len());
                    parsed.push(value);
                }
                Err(e @ ExtractorError::CircuitOpen { .. }) => {
                    warn!("Skipping chunks {}..{}: {}", index, chunks.len(), e);
                    failures.extend((index..chunks.len()).map(|index| ChunkFailure {
                        index,
                        reason: e.to_string(),
                    }));
                    last_error = Some(e);
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    if let Some(interrupt) = ctx.interrupted() {
                        warn!("Stopping {} at chunk {}: {}", task.as_str(), index, interrupt);
                        return Err(interrupt.into());
                    }
                    warn!("Chunk {}/{} failed: {}", index + 1, chunks.len(), e);
                    failures.push(ChunkFailure {
                        index,
                        reason: e.to_string(),
                    });
                    last_error = Some(e);
                }
            }
        }

        if parsed.is_empty() {
            return Err(match last_error {
                Some(e @ ExtractorError::CircuitOpen { .. }) => e,
                Some(e) if chunks.len() == 1 => e,
                Some(e) => ExtractorError::NoChunkSucceeded {
                    chunks: chunks.len(),
                    last_error: e.to_string(),
                },
                None => ExtractorError::EmptyInput,
            });
        }

        let metadata = ExtractionMetadata {
            provider: self.provider.provider().name().to_string(),
            chunks_total: chunks.len(),
            chunks_succeeded: parsed.len(),
            chunk_failures: failures,
            processing_time_ms: millis(start.elapsed()),
        };
        Ok((parsed, metadata))
    }

    async fn call_leading_chunk(
        &self,
        ctx: &CallContext,
        task: ExtractionTask,
        content: &str,
    ) -> Result<String, ExtractorError> {
        let chunks = self.chunks(content)?;
        if chunks.len() > 1 {
            debug!(
                "{} uses the first of {} chunks",
                task.as_str(),
                chunks.len()
            );
        }
        let leading = chunks.into_iter().next().ok_or(ExtractorError::EmptyInput)?;
        self.call(ctx, task, &leading).await
    }

    async fn call(
        &self,
        ctx: &CallContext,
        task: ExtractionTask,
        chunk: &str,
    ) -> Result<String, ExtractorError> {
        let call_ctx = ctx.with_timeout(self.config.call_timeout());
        let raw = self.provider.complete(&call_ctx, task, chunk).await?;
        debug!("LLM response length: {} chars", raw.len());
        Ok(raw)
    }

    fn chunks(&self, content: &str) -> Result<Vec<String>, ExtractorError> {
        let chunks = self.segmenter.segment(content);
        if chunks.is_empty() {
            return Err(ExtractorError::EmptyInput);
        }
        Ok(chunks)
    }
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
