use std::path::PathBuf;
use std::time::Duration;

use lode_index::{IndexerConfig, RateLimit, SegmenterConfig};
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub indexer: IndexingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_api_url() -> String {
    lode_source::github::DEFAULT_API_URL.into()
}

fn default_extensions() -> Vec<String> {
    vec!["py".into()]
}

fn default_max_depth() -> usize {
    lode_source::fetcher::DEFAULT_MAX_DEPTH
}

fn default_concurrency() -> usize {
    lode_source::fetcher::DEFAULT_CONCURRENCY
}

fn default_rate_limit_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// File extensions to keep, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Concurrent file body requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retries on HTTP 429 from the source API.
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            extensions: default_extensions(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

fn default_batch_size() -> usize {
    500
}

fn default_window_seconds() -> u64 {
    60
}

fn default_max_requests_per_window() -> u64 {
    500
}

fn default_retry_limit() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_max_requests_per_window")]
    pub max_requests_per_window: u64,
    /// Attempts per batch, including the first.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            window_seconds: default_window_seconds(),
            max_requests_per_window: default_max_requests_per_window(),
            retry_limit: default_retry_limit(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl IndexingConfig {
    #[must_use]
    pub fn to_indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            batch_size: self.batch_size,
            rate_limit: RateLimit {
                window_seconds: self.window_seconds,
                max_requests_per_window: self.max_requests_per_window,
            },
            retry_limit: self.retry_limit,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

/// Embedding backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
    #[cfg(feature = "mock")]
    Mock,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            #[cfg(feature = "mock")]
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// Provider endpoint. Each provider has its own default.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Retries on HTTP 429 from the embedding service, inside one attempt.
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: None,
            model: default_embedding_model(),
            rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/corpus.json")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/index.json")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            index_path: default_index_path(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResolvedSecrets {
    pub github_token: Option<Secret>,
    pub openai_api_key: Option<Secret>,
}
