//! Embedding module for recap
//!
//! Backends that turn sentences into vectors, plus the similarity measure
//! the segmenter uses to find topic shifts.

mod ollama;
mod openai;
mod provider;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use provider::{build_embedding_provider, cosine_distance, cosine_similarity, EmbeddingProvider};
