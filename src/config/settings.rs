//! Application settings management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::prompts::{
    DEFAULT_INITIAL_TEMPLATE, DEFAULT_REFINE_TEMPLATE, EXISTING_ANSWER_VAR, TEXT_VAR,
};
use crate::segment::ThresholdType;
use crate::RecapError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Semantic segmentation settings
    #[serde(default)]
    pub segmenter: SegmenterSettings,

    /// Language model settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Prompt templates for the refine loop
    #[serde(default)]
    pub prompts: PromptSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Embedding backend (openai, ollama)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API endpoint (empty = backend default)
    #[serde(default)]
    pub endpoint: String,

    /// API key (for hosted backends)
    #[serde(default)]
    pub api_key: String,

    /// Number of texts sent per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum embedding requests in flight
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterSettings {
    /// How the breakpoint threshold is derived from the distance distribution
    #[serde(default)]
    pub threshold_type: ThresholdType,

    /// Quantile in [0, 1] used by the percentile and gradient strategies
    #[serde(default = "default_threshold_percentile")]
    pub threshold_percentile: f64,

    /// Multiplier used by the standard_deviation and interquartile strategies
    #[serde(default = "default_threshold_amount")]
    pub threshold_amount: f64,

    /// Neighbouring sentences embedded together with each sentence
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Chunks shorter than this many characters are merged into a neighbour (0 = off)
    #[serde(default)]
    pub min_chunk_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// LLM provider (openrouter, gemini)
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API endpoint (empty = provider default)
    #[serde(default)]
    pub endpoint: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature (unset = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Completion token limit (unset = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSettings {
    /// Template for the first chunk; must contain `{text}`
    #[serde(default = "default_initial_prompt")]
    pub initial: String,

    /// Template for every later chunk; must contain `{existing_answer}` and `{text}`
    #[serde(default = "default_refine_prompt")]
    pub refine: String,
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_batch_size() -> usize {
    64
}

fn default_max_concurrency() -> usize {
    4
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_threshold_percentile() -> f64 {
    0.95
}

fn default_threshold_amount() -> f64 {
    3.0
}

fn default_buffer_size() -> usize {
    1
}

fn default_llm_provider() -> String {
    "openrouter".to_string()
}

fn default_llm_model() -> String {
    "google/gemini-2.0-flash-exp:free".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_initial_prompt() -> String {
    DEFAULT_INITIAL_TEMPLATE.to_string()
}

fn default_refine_prompt() -> String {
    DEFAULT_REFINE_TEMPLATE.to_string()
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            endpoint: String::new(),
            api_key: String::new(),
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            threshold_type: ThresholdType::default(),
            threshold_percentile: default_threshold_percentile(),
            threshold_amount: default_threshold_amount(),
            buffer_size: default_buffer_size(),
            min_chunk_chars: 0,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: String::new(),
            model: default_llm_model(),
            endpoint: String::new(),
            timeout_secs: default_llm_timeout(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            initial: default_initial_prompt(),
            refine: default_refine_prompt(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::debug!("No config file found, using defaults");
            let mut settings = Self::default();
            settings.apply_env_overrides();
            return Ok(settings);
        }

        let mut settings = Self::load_from(&config_path)?;
        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Parse a settings file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply environment variable overrides.
    ///
    /// Credentials are resolved here once; providers never read the
    /// environment themselves.
    fn apply_env_overrides(&mut self) {
        let llm_var = match self.llm.provider.to_lowercase().as_str() {
            "gemini" => "RECAP_GEMINI_API_KEY",
            _ => "OPENROUTER_API_KEY",
        };
        fill_from_env(&mut self.llm.api_key, &[llm_var]);
        fill_from_env(
            &mut self.embedding.api_key,
            &["RECAP_EMBEDDING_API_KEY", "OPENAI_API_KEY"],
        );
    }

    /// Check the values the pipeline depends on.
    pub fn validate(&self) -> crate::Result<()> {
        let seg = &self.segmenter;
        if !seg.threshold_percentile.is_finite() || !(0.0..=1.0).contains(&seg.threshold_percentile)
        {
            return Err(RecapError::Configuration(format!(
                "segmenter.threshold_percentile must be within [0, 1], got {}",
                seg.threshold_percentile
            )));
        }
        if !seg.threshold_amount.is_finite() || seg.threshold_amount < 0.0 {
            return Err(RecapError::Configuration(format!(
                "segmenter.threshold_amount must be a non-negative number, got {}",
                seg.threshold_amount
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(RecapError::Configuration(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.max_concurrency == 0 {
            return Err(RecapError::Configuration(
                "embedding.max_concurrency must be at least 1".to_string(),
            ));
        }

        require_placeholders("prompts.initial", &self.prompts.initial, &[TEXT_VAR])?;
        require_placeholders(
            "prompts.refine",
            &self.prompts.refine,
            &[EXISTING_ANSWER_VAR, TEXT_VAR],
        )?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "recap", "recap")
            .context("Could not determine config directory")?;

        let config_dir = dirs.config_dir();
        Ok(config_dir.join("config.toml"))
    }

    /// Write default configuration to a file
    pub fn write_default(path: &Path) -> Result<()> {
        Self::default().write_to(path)
    }

    /// Serialize these settings to a file, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Return a copy with a single dotted key (e.g. `segmenter.buffer_size`) replaced.
    ///
    /// The value is parsed as a TOML literal when possible and falls back to
    /// a plain string, so `0.9`, `true` and `gemini` all work unquoted.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self> {
        let (section, field) = key
            .split_once('.')
            .with_context(|| format!("Config key '{}' must look like section.field", key))?;

        let mut root = toml::Value::try_from(self)?;
        let table = root
            .get_mut(section)
            .and_then(toml::Value::as_table_mut)
            .with_context(|| format!("Unknown config section '{}'", section))?;

        let known = table.contains_key(field) || is_optional_field(section, field);
        if !known {
            anyhow::bail!("Unknown config key '{}'", key);
        }

        table.insert(field.to_string(), parse_toml_literal(value));

        let updated: Settings = root
            .try_into()
            .with_context(|| format!("Invalid value '{}' for {}", value, key))?;
        Ok(updated)
    }
}

fn fill_from_env(target: &mut String, vars: &[&str]) {
    if !target.trim().is_empty() {
        return;
    }
    for var in vars {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                *target = value;
                return;
            }
        }
    }
}

fn require_placeholders(name: &str, template: &str, vars: &[&str]) -> crate::Result<()> {
    if template.trim().is_empty() {
        return Err(RecapError::Configuration(format!("{} is empty", name)));
    }
    for var in vars {
        let placeholder = format!("{{{}}}", var);
        if !template.contains(&placeholder) {
            return Err(RecapError::Configuration(format!(
                "{} is missing the {} placeholder",
                name, placeholder
            )));
        }
    }
    Ok(())
}

// Fields skipped during serialization while unset.
fn is_optional_field(section: &str, field: &str) -> bool {
    matches!((section, field), ("llm", "temperature") | ("llm", "max_tokens"))
}

fn parse_toml_literal(value: &str) -> toml::Value {
    format!("v = {}", value)
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}
