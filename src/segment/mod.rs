//! Semantic segmentation module for recap
//!
//! Splits a transcript into sentences, embeds them, and groups consecutive
//! sentences into chunks wherever the topic does not shift.

mod chunker;
mod spans;
mod threshold;

pub use chunker::{Chunk, SemanticSegmenter};
pub use spans::{combine_with_neighbours, join_spans, split_spans, Span};
pub use threshold::{quantile, BreakpointStrategy};

/// Breakpoint threshold type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdType {
    /// Distances above a quantile of all distances
    #[default]
    Percentile,
    /// Distances more than k standard deviations above the mean
    StandardDeviation,
    /// Distances more than k interquartile ranges above the mean
    Interquartile,
    /// Quantile of the distance gradient, for transcripts with slow drift
    Gradient,
}
