use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::{LlmError, Result};
use crate::provider::{EmbeddingProvider, ensure_count};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Ollama,
    model: String,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(base_url: &str, model: String) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| LlmError::Embed {
                provider: "ollama".into(),
                reason: e.to_string(),
            })?;

        ensure_count("ollama", texts.len(), response.embeddings)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_port_variants() {
        assert_eq!(
            parse_host_port("http://localhost:11434"),
            ("http://localhost".into(), 11434)
        );
        assert_eq!(
            parse_host_port("http://example.com:8080/"),
            ("http://example.com".into(), 8080)
        );
        assert_eq!(
            parse_host_port("http://localhost"),
            ("http://localhost".into(), 11434)
        );
    }

    #[test]
    fn new_stores_model() {
        let e = OllamaEmbedder::new(DEFAULT_BASE_URL, "nomic-embed-text".into());
        assert_eq!(e.model(), "nomic-embed-text");
        assert_eq!(e.name(), "ollama");
    }

    #[tokio::test]
    async fn empty_batch_skips_request() {
        let e = OllamaEmbedder::new("http://127.0.0.1:1", "m".into());
        assert!(e.embed_batch(&[]).await.unwrap().is_empty());
    }
}
