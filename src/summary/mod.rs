//! Summarization module for recap
//!
//! The refine loop and the end-to-end pipeline entry point.

mod pipeline;
mod refine;

pub use pipeline::{summarize, Summary, SummaryPipeline};
pub use refine::{ProgressCallback, RefineOrchestrator, RefineOutcome};
