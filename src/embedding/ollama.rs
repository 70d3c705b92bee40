use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::embedding::provider::EmbeddingProvider;

const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Client for a local Ollama server's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    http: Client,
    model: String,
    endpoint: String,
}

impl OllamaEmbedder {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let model = settings.embedding.model.trim().to_string();
        if model.is_empty() {
            anyhow::bail!("embedding.model must name an Ollama embedding model");
        }

        let endpoint = match settings.embedding.endpoint.trim() {
            "" => DEFAULT_OLLAMA_ENDPOINT.to_string(),
            e => e.trim_end_matches('/').to_string(),
        };

        Ok(Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(
                    settings.embedding.timeout_secs,
                ))
                .build()
                .context("Failed to build Ollama HTTP client")?,
            model,
            endpoint,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(format!("{}/api/embed", self.endpoint))
            .json(&body)
            .send()
            .await
            .context("Ollama embed request failed")?
            .error_for_status()
            .context("Ollama returned an error status")?;

        let payload: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse Ollama embed response")?;

        into_vectors(payload, texts.len())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

fn into_vectors(payload: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if payload.embeddings.len() != expected {
        anyhow::bail!(
            "Ollama returned {} vectors for {} inputs",
            payload.embeddings.len(),
            expected
        );
    }
    Ok(payload.embeddings)
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}
