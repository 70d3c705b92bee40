use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::embedding::provider::EmbeddingProvider;

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbedder {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiEmbedder {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.embedding.api_key.trim().to_string();
        if api_key.is_empty() {
            anyhow::bail!(
                "Embedding API key is missing. Set embedding.api_key in config or RECAP_EMBEDDING_API_KEY."
            );
        }

        let endpoint = match settings.embedding.endpoint.trim() {
            "" => DEFAULT_OPENAI_ENDPOINT.to_string(),
            e => e.trim_end_matches('/').to_string(),
        };

        Ok(Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(
                    settings.embedding.timeout_secs,
                ))
                .build()
                .context("Failed to build embedding HTTP client")?,
            api_key,
            model: settings.embedding.model.trim().to_string(),
            endpoint,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error {}: {}", status, detail.trim());
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        into_ordered_vectors(payload, texts.len())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn into_ordered_vectors(payload: EmbeddingsResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = payload.data;
    if data.len() != expected {
        anyhow::bail!(
            "Embedding response has {} vectors for {} inputs",
            data.len(),
            expected
        );
    }
    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        anyhow::bail!("Embedding response indices are not contiguous");
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingsData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsData {
    index: usize,
    embedding: Vec<f32>,
}
