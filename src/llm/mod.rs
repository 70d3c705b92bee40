//! LLM module for recap
//!
//! Text completion backends (OpenRouter, Gemini) and the prompt templates
//! used by the refine loop.

mod client;
mod gemini;
mod openrouter;
pub mod prompts;

pub use client::{build_provider, LanguageModelProvider};
pub use gemini::GeminiClient;
pub use openrouter::OpenRouterClient;
pub use prompts::PromptTemplate;
