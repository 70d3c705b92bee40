//! Transcript → chunks → summary.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::embedding::{build_embedding_provider, EmbeddingProvider};
use crate::llm::{build_provider, LanguageModelProvider, PromptTemplate};
use crate::segment::SemanticSegmenter;
use crate::summary::refine::{ProgressCallback, RefineOrchestrator};
use crate::{RecapError, Result};

/// Final output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub chunk_count: usize,
}

/// Chunk-and-refine summarization of a single transcript.
///
/// Instances share no mutable state; independent transcripts may be
/// summarized concurrently through the same pipeline.
pub struct SummaryPipeline {
    segmenter: SemanticSegmenter,
    embedder: Arc<dyn EmbeddingProvider>,
    orchestrator: RefineOrchestrator,
}

impl SummaryPipeline {
    pub fn new(
        segmenter: SemanticSegmenter,
        embedder: Arc<dyn EmbeddingProvider>,
        orchestrator: RefineOrchestrator,
    ) -> Self {
        Self {
            segmenter,
            embedder,
            orchestrator,
        }
    }

    /// Validate settings and build both providers from them.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let initial = PromptTemplate::initial(settings.prompts.initial.clone())?;
        let refine = PromptTemplate::refine(settings.prompts.refine.clone())?;

        let embedder: Arc<dyn EmbeddingProvider> = build_embedding_provider(settings)
            .map_err(|e| RecapError::Configuration(format!("{:#}", e)))?
            .into();
        let llm: Arc<dyn LanguageModelProvider> = build_provider(settings)
            .map_err(|e| RecapError::Configuration(format!("{:#}", e)))?
            .into();

        Ok(Self::new(
            SemanticSegmenter::from_settings(settings),
            embedder,
            RefineOrchestrator::new(llm, initial, refine),
        ))
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.orchestrator = self.orchestrator.with_progress(progress);
        self
    }

    /// Summarize `transcript`, returning only the final text.
    pub async fn summarize(&self, transcript: &str) -> Result<String> {
        self.run(transcript, &CancellationToken::new())
            .await
            .map(|s| s.text)
    }

    /// Summarize `transcript`, stopping as soon as `cancel` fires.
    ///
    /// Blank input is rejected before any provider call, and segmentation
    /// errors abort before any model call. Cancellation during segmentation
    /// abandons the pending embedding requests.
    pub async fn run(&self, transcript: &str, cancel: &CancellationToken) -> Result<Summary> {
        if transcript.trim().is_empty() {
            return Err(RecapError::InvalidInput(
                "transcript is empty or whitespace-only".to_string(),
            ));
        }

        tracing::info!(chars = transcript.len(), "Summarizing transcript");

        let chunks = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("Summarization cancelled during segmentation");
                return Err(RecapError::Cancelled {
                    completed_chunks: 0,
                    partial_summary: String::new(),
                });
            }
            chunks = self.segmenter.segment(transcript, self.embedder.as_ref()) => chunks?,
        };

        let outcome = self.orchestrator.run(chunks.as_slice(), cancel).await?;

        Ok(Summary {
            text: outcome.summary,
            chunk_count: outcome.chunk_count,
        })
    }
}

/// Summarize a transcript with providers and prompts taken from `settings`.
pub async fn summarize(transcript: &str, settings: &Settings) -> Result<String> {
    if transcript.trim().is_empty() {
        return Err(RecapError::InvalidInput(
            "transcript is empty or whitespace-only".to_string(),
        ));
    }
    SummaryPipeline::from_settings(settings)?
        .summarize(transcript)
        .await
}
