mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use lode_llm::{AnyEmbedder, OllamaEmbedder, OpenAiEmbedder};
use lode_source::{ExtensionFilter, FetchConfig, GitHubSource};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.extensions.is_empty() {
            bail!("source.extensions must list at least one extension");
        }
        let filter = ExtensionFilter::new(self.source.extensions.iter().map(String::as_str));
        let unsupported = filter.unsupported();
        if !unsupported.is_empty() {
            bail!(
                "source.extensions has no enabled grammar for: {}",
                unsupported.join(", ")
            );
        }
        if self.source.concurrency == 0 {
            bail!("source.concurrency must be > 0");
        }
        self.segmenter.validate().context("invalid [segmenter] section")?;
        self.indexer
            .to_indexer_config()
            .validate()
            .context("invalid [indexer] section")?;
        if self.indexer.window_seconds == 0 {
            bail!("indexer.window_seconds must be > 0");
        }
        if self.embedding.model.trim().is_empty() {
            bail!("embedding.model must not be empty");
        }
        Ok(())
    }

    #[must_use]
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            extensions: ExtensionFilter::new(self.source.extensions.iter().map(String::as_str)),
            max_depth: self.source.max_depth,
            concurrency: self.source.concurrency,
        }
    }

    /// Build the GitHub client described by `[source]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `source.api_url` is not a valid base URL.
    pub fn github_source(&self) -> anyhow::Result<GitHubSource> {
        let source = GitHubSource::new()
            .with_api_url(&self.source.api_url)
            .with_context(|| format!("invalid source.api_url {}", self.source.api_url))?
            .with_token(
                self.secrets
                    .github_token
                    .as_ref()
                    .map(|t| t.expose().to_owned()),
            )
            .with_rate_limit_retries(self.source.rate_limit_retries);
        Ok(source)
    }

    /// Build the embedding backend described by `[embedding]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenAI provider is selected without
    /// `LODE_OPENAI_API_KEY`.
    pub fn build_embedder(&self) -> anyhow::Result<AnyEmbedder> {
        let embedding = &self.embedding;
        match embedding.provider {
            ProviderKind::OpenAi => {
                let key = self
                    .secrets
                    .openai_api_key
                    .as_ref()
                    .context("LODE_OPENAI_API_KEY is required for the openai provider")?;
                Ok(AnyEmbedder::OpenAi(
                    OpenAiEmbedder::new(
                        key.expose().to_owned(),
                        embedding
                            .base_url
                            .clone()
                            .unwrap_or_else(|| lode_llm::openai::DEFAULT_BASE_URL.into()),
                        embedding.model.clone(),
                    )
                    .with_rate_limit_retries(embedding.rate_limit_retries),
                ))
            }
            ProviderKind::Ollama => Ok(AnyEmbedder::Ollama(OllamaEmbedder::new(
                embedding
                    .base_url
                    .as_deref()
                    .unwrap_or(lode_llm::ollama::DEFAULT_BASE_URL),
                embedding.model.clone(),
            ))),
            #[cfg(feature = "mock")]
            ProviderKind::Mock => Ok(AnyEmbedder::Mock(lode_llm::MockEmbedder::default())),
        }
    }
}
