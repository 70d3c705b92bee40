use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::llm::client::LanguageModelProvider;

const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.0-flash-exp:free";

/// OpenAI-compatible chat completions client pointed at OpenRouter.
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenRouterClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.llm.api_key.trim().to_string();
        if api_key.is_empty() {
            anyhow::bail!(
                "OpenRouter API key is missing. Set llm.api_key in config or OPENROUTER_API_KEY."
            );
        }

        let model = if settings.llm.model.trim().is_empty() {
            DEFAULT_OPENROUTER_MODEL.to_string()
        } else {
            settings.llm.model.trim().to_string()
        };

        let endpoint = if settings.llm.endpoint.trim().is_empty() {
            DEFAULT_OPENROUTER_ENDPOINT.to_string()
        } else {
            settings
                .llm
                .endpoint
                .trim()
                .trim_end_matches('/')
                .to_string()
        };

        Ok(Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(settings.llm.timeout_secs))
                .build()
                .context("Failed to build OpenRouter HTTP client")?,
            api_key,
            model,
            endpoint,
            temperature: settings.llm.temperature,
            max_tokens: settings.llm.max_tokens,
        })
    }

    fn request_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }
}

#[async_trait]
impl LanguageModelProvider for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(self.request_url())
            .bearer_auth(&self.api_key)
            .header("X-Title", crate::APP_NAME)
            .json(&body)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                anyhow::bail!("OpenRouter rate limit exceeded: {}", detail.trim());
            }
            anyhow::bail!("OpenRouter API error {}: {}", status, detail.trim());
        }

        let payload: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;

        extract_text(payload)
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

fn extract_text(payload: ChatResponse) -> Result<String> {
    // OpenRouter reports upstream failures inside a 200 body.
    if let Some(error) = payload.error {
        anyhow::bail!("OpenRouter upstream error: {}", error.message);
    }

    let choice = payload
        .choices
        .into_iter()
        .next()
        .context("OpenRouter response did not contain any choices")?;

    if choice.finish_reason.as_deref() == Some("length") {
        anyhow::bail!("OpenRouter response was truncated at the token limit");
    }

    choice
        .message
        .content
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .context("OpenRouter response did not contain completion text")
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}
