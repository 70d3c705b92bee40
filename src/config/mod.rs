//! Configuration module for recap
//!
//! Handles loading and managing application settings from TOML files.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings, SegmenterSettings, Settings,
};
