//! Refine loop: fold each chunk into a running summary, one model call per chunk.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::llm::prompts::{build_initial_prompt, build_refine_prompt};
use crate::llm::{LanguageModelProvider, PromptTemplate};
use crate::{RecapError, Result};

/// Progress callback, invoked with (chunks folded, total chunks)
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Result of a completed refine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineOutcome {
    pub summary: String,
    pub chunk_count: usize,
}

/// Drives the sequential summarization of an ordered chunk list.
///
/// The first chunk is rendered with the initial template; every later chunk
/// is rendered with the refine template together with the summary so far,
/// whose response replaces that summary. Calls are strictly sequential
/// since each prompt embeds the previous response.
pub struct RefineOrchestrator {
    llm: Arc<dyn LanguageModelProvider>,
    initial: PromptTemplate,
    refine: PromptTemplate,
    progress: Option<ProgressCallback>,
}

impl RefineOrchestrator {
    pub fn new(
        llm: Arc<dyn LanguageModelProvider>,
        initial: PromptTemplate,
        refine: PromptTemplate,
    ) -> Self {
        Self {
            llm,
            initial,
            refine,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Summarize `chunks` in order.
    ///
    /// A failed model call aborts the run with `SummarizationFailure`
    /// carrying the 1-based chunk index and the summary through the
    /// previous chunk. Cancellation stops before the next call (or
    /// abandons the in-flight one) and returns `Cancelled` with the
    /// summary through the last completed chunk.
    pub async fn run<S: AsRef<str>>(
        &self,
        chunks: &[S],
        cancel: &CancellationToken,
    ) -> Result<RefineOutcome> {
        if chunks.is_empty() {
            return Err(RecapError::InvalidInput(
                "refine loop needs at least one chunk".to_string(),
            ));
        }

        let total = chunks.len();
        let mut summary = String::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let step = i + 1;
            let text = chunk.as_ref();

            let prompt = if i == 0 {
                build_initial_prompt(&self.initial, text)
            } else {
                build_refine_prompt(&self.refine, &summary, text)
            };

            tracing::debug!(
                step,
                total,
                prompt_chars = prompt.len(),
                provider = self.llm.name(),
                "Calling language model"
            );

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(completed = i, total, "Summarization cancelled");
                    return Err(RecapError::Cancelled {
                        completed_chunks: i,
                        partial_summary: summary,
                    });
                }
                response = self.llm.complete(&prompt) => response,
            };

            summary = match response {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => {
                    return Err(RecapError::SummarizationFailure {
                        chunk_index: step,
                        partial_summary: summary,
                        source: anyhow::anyhow!(
                            "{} returned an empty completion",
                            self.llm.name()
                        ),
                    });
                }
                Err(source) => {
                    tracing::warn!(step, total, error = %source, "Language model call failed");
                    return Err(RecapError::SummarizationFailure {
                        chunk_index: step,
                        partial_summary: summary,
                        source,
                    });
                }
            };

            if let Some(progress) = &self.progress {
                progress(step, total);
            }
        }

        tracing::info!(chunks = total, summary_chars = summary.len(), "Refine loop complete");

        Ok(RefineOutcome {
            summary,
            chunk_count: total,
        })
    }
}
