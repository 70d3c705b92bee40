use anyhow::Result;
use async_trait::async_trait;

use crate::config::Settings;
use crate::llm::gemini::GeminiClient;
use crate::llm::openrouter::OpenRouterClient;

/// Text completion backend used by the refine loop.
///
/// Implementations must report rate limits, timeouts and malformed
/// responses as errors rather than returning truncated text. Retries, if
/// any, belong here and not in the caller.
#[async_trait]
pub trait LanguageModelProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Build an LLM provider from runtime settings.
pub fn build_provider(settings: &Settings) -> Result<Box<dyn LanguageModelProvider>> {
    match settings.llm.provider.to_lowercase().as_str() {
        "openrouter" => Ok(Box::new(OpenRouterClient::from_settings(settings)?)),
        "gemini" => Ok(Box::new(GeminiClient::from_settings(settings)?)),
        other => anyhow::bail!(
            "Unsupported llm.provider '{}'. Supported providers: openrouter, gemini",
            other
        ),
    }
}
