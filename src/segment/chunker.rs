//! Semantic segmentation of a transcript into topic-coherent chunks.

use std::ops::Range;

use futures_util::{stream, StreamExt, TryStreamExt};

use crate::config::Settings;
use crate::embedding::{cosine_distance, EmbeddingProvider};
use crate::segment::spans::{combine_with_neighbours, join_spans, split_spans, Span};
use crate::segment::threshold::BreakpointStrategy;
use crate::{RecapError, Result};

/// A contiguous run of spans, rejoined into plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    /// Span indices covered by this chunk
    pub spans: Range<usize>,
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Splits a transcript wherever the embedding distance between adjacent
/// sentences jumps above a document-relative threshold.
#[derive(Debug, Clone)]
pub struct SemanticSegmenter {
    strategy: BreakpointStrategy,
    buffer_size: usize,
    min_chunk_chars: usize,
    batch_size: usize,
    max_concurrency: usize,
}

impl SemanticSegmenter {
    pub fn new(strategy: BreakpointStrategy) -> Self {
        Self {
            strategy,
            buffer_size: 1,
            min_chunk_chars: 0,
            batch_size: 64,
            max_concurrency: 4,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            strategy: BreakpointStrategy::from_settings(&settings.segmenter),
            buffer_size: settings.segmenter.buffer_size,
            min_chunk_chars: settings.segmenter.min_chunk_chars,
            batch_size: settings.embedding.batch_size.max(1),
            max_concurrency: settings.embedding.max_concurrency.max(1),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_min_chunk_chars(mut self, min_chunk_chars: usize) -> Self {
        self.min_chunk_chars = min_chunk_chars;
        self
    }

    pub fn with_batching(mut self, batch_size: usize, max_concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Split `transcript` into ordered, non-empty chunks.
    ///
    /// Fails with `InvalidInput` for blank text and with `EmbeddingFailure`
    /// if any embedding request fails; no chunks are produced in either case.
    pub async fn segment(
        &self,
        transcript: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Chunk>> {
        let spans = split_spans(transcript);
        if spans.is_empty() {
            return Err(RecapError::InvalidInput(
                "transcript is empty or whitespace-only".to_string(),
            ));
        }

        if spans.len() == 1 {
            tracing::debug!("Transcript is a single sentence, skipping embeddings");
            return Ok(self.segment_with_embeddings(&spans, &[]));
        }

        let texts = combine_with_neighbours(&spans, self.buffer_size);
        let embeddings = self.embed_in_order(&texts, embedder).await?;

        let chunks = self.segment_with_embeddings(&spans, &embeddings);
        tracing::info!(
            spans = spans.len(),
            chunks = chunks.len(),
            provider = embedder.name(),
            "Segmented transcript"
        );
        Ok(chunks)
    }

    /// Group spans into chunks given one embedding per span.
    ///
    /// Deterministic: identical spans and vectors always yield identical
    /// boundaries. Missing embeddings mean no distances, hence one chunk.
    pub fn segment_with_embeddings(&self, spans: &[Span], embeddings: &[Vec<f32>]) -> Vec<Chunk> {
        let distances: Vec<f64> = embeddings
            .windows(2)
            .map(|pair| cosine_distance(&pair[0], &pair[1]))
            .collect();

        let breakpoints = self.strategy.breakpoints(&distances);

        let mut ranges = Vec::with_capacity(breakpoints.len() + 1);
        let mut start = 0;
        for bp in breakpoints {
            ranges.push(start..bp + 1);
            start = bp + 1;
        }
        ranges.push(start..spans.len());

        let ranges = merge_short_ranges(ranges, spans, self.min_chunk_chars);

        ranges
            .into_iter()
            .enumerate()
            .map(|(index, range)| Chunk {
                index,
                text: join_spans(&spans[range.clone()]),
                spans: range,
            })
            .collect()
    }

    async fn embed_in_order(
        &self,
        texts: &[String],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Vec<f32>>> {
        let batch_count = texts.len().div_ceil(self.batch_size);
        tracing::debug!(
            texts = texts.len(),
            batches = batch_count,
            concurrency = self.max_concurrency,
            "Requesting embeddings"
        );

        // `buffered` yields results in submission order regardless of which
        // request finishes first.
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size).enumerate())
            .map(|(i, batch)| async move {
                let vectors = embedder.embed(batch).await.map_err(|e| {
                    RecapError::EmbeddingFailure(format!(
                        "batch {}/{} via {}: {:#}",
                        i + 1,
                        batch_count,
                        embedder.name(),
                        e
                    ))
                })?;
                validate_batch(&vectors, batch.len())?;
                Ok::<_, RecapError>(vectors)
            })
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        check_dimensions(&embeddings)?;
        Ok(embeddings)
    }
}

fn validate_batch(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    if vectors.len() != expected {
        return Err(RecapError::EmbeddingFailure(format!(
            "provider returned {} vectors for {} spans",
            vectors.len(),
            expected
        )));
    }
    if vectors
        .iter()
        .any(|v| v.is_empty() || v.iter().any(|x| !x.is_finite()))
    {
        return Err(RecapError::EmbeddingFailure(
            "provider returned an empty or non-finite vector".to_string(),
        ));
    }
    Ok(())
}

fn check_dimensions(embeddings: &[Vec<f32>]) -> Result<()> {
    let Some(first) = embeddings.first() else {
        return Ok(());
    };
    if let Some(bad) = embeddings.iter().find(|v| v.len() != first.len()) {
        return Err(RecapError::EmbeddingFailure(format!(
            "inconsistent vector dimensions ({} vs {})",
            first.len(),
            bad.len()
        )));
    }
    Ok(())
}

// Folds chunks under `min_chars` into the following chunk; a short tail
// folds into its predecessor.
fn merge_short_ranges(
    ranges: Vec<Range<usize>>,
    spans: &[Span],
    min_chars: usize,
) -> Vec<Range<usize>> {
    if min_chars == 0 {
        return ranges;
    }

    let chars = |r: &Range<usize>| join_spans(&spans[r.clone()]).chars().count();

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    let mut pending: Option<Range<usize>> = None;
    for range in ranges {
        let current = match pending.take() {
            Some(p) => p.start..range.end,
            None => range,
        };
        if chars(&current) < min_chars {
            pending = Some(current);
        } else {
            merged.push(current);
        }
    }

    if let Some(tail) = pending {
        match merged.last_mut() {
            Some(last) => last.end = tail.end,
            None => merged.push(tail),
        }
    }
    merged
}
