//! recap - Turn long video transcripts into concise summaries with key takeaways
//!
//! A transcript is split into semantically coherent chunks using embedding
//! distances, then folded chunk by chunk into a running summary with a
//! language model ("refine" summarization).

pub mod cli;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod segment;
pub mod summary;

use thiserror::Error;

/// Main error type for recap
#[derive(Error, Debug)]
pub enum RecapError {
    /// Empty or whitespace-only transcript
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding provider unreachable or returned a malformed response
    #[error("Embedding failure: {0}")]
    EmbeddingFailure(String),

    /// A model call failed inside the refine loop
    #[error("Summarization failed at chunk {chunk_index}: {source}")]
    SummarizationFailure {
        /// 1-based index of the chunk whose model call failed
        chunk_index: usize,
        /// Running summary after the last successfully folded chunk
        partial_summary: String,
        #[source]
        source: anyhow::Error,
    },

    /// The run was cancelled between two chunk steps
    #[error("Summarization cancelled after {completed_chunks} chunk(s)")]
    Cancelled {
        completed_chunks: usize,
        partial_summary: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecapError {
    /// Best-effort partial summary carried by refine-loop failures.
    pub fn partial_summary(&self) -> Option<&str> {
        match self {
            RecapError::SummarizationFailure {
                partial_summary, ..
            }
            | RecapError::Cancelled {
                partial_summary, ..
            } if !partial_summary.is_empty() => Some(partial_summary.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecapError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "recap";
