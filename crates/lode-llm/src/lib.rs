//! Embedding service abstraction for lode.
//!
//! One [`EmbeddingProvider`] call embeds a whole batch of texts. Backends: any
//! OpenAI-compatible endpoint, Ollama, and a deterministic mock behind the
//! `mock` feature.

pub mod any;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub(crate) mod retry;

pub use any::AnyEmbedder;
pub use error::{LlmError, Result};
#[cfg(feature = "mock")]
pub use mock::MockEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use provider::{EmbeddingProvider, StatusTx};
