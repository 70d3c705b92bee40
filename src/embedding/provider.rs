use anyhow::Result;
use async_trait::async_trait;

use crate::config::Settings;
use crate::embedding::ollama::OllamaEmbedder;
use crate::embedding::openai::OpenAiEmbedder;

/// Maps text to fixed-dimension vectors for similarity comparison.
///
/// `embed` returns exactly one vector per input, in input order, or an
/// error. Partial results are never returned.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Build an embedding provider from runtime settings.
pub fn build_embedding_provider(settings: &Settings) -> Result<Box<dyn EmbeddingProvider>> {
    match settings.embedding.provider.to_lowercase().as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::from_settings(settings)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::from_settings(settings)?)),
        other => anyhow::bail!(
            "Unsupported embedding.provider '{}'. Supported providers: openai, ollama",
            other
        ),
    }
}

/// Compute cosine similarity between two embedding vectors
///
/// Returns a value in [-1, 1] where 1 means identical direction. Zero
/// vectors and mismatched dimensions yield 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Cosine distance (`1 - similarity`), in [0, 2].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - f64::from(cosine_similarity(a, b))
}
