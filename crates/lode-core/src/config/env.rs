use std::path::PathBuf;
use std::str::FromStr;

use super::Config;
use crate::secret;

/// Parse `key` into `target`, warning and keeping the old value when invalid.
fn override_parsed<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.trim().parse::<T>() {
            *target = parsed;
        } else {
            tracing::warn!("ignoring invalid {key} value: {v}");
        }
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_source();
        self.apply_env_overrides_pipeline();
        self.apply_env_overrides_embedding();
        self.apply_env_secrets();
    }

    fn apply_env_overrides_source(&mut self) {
        if let Ok(v) = std::env::var("LODE_GITHUB_API_URL") {
            self.source.api_url = v;
        }
        if let Ok(v) = std::env::var("LODE_EXTENSIONS") {
            self.source.extensions = v
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
        }
        override_parsed("LODE_MAX_DEPTH", &mut self.source.max_depth);
        override_parsed("LODE_FETCH_CONCURRENCY", &mut self.source.concurrency);
    }

    fn apply_env_overrides_pipeline(&mut self) {
        override_parsed("LODE_TARGET_LINES", &mut self.segmenter.target_lines);
        override_parsed("LODE_OVERLAP_LINES", &mut self.segmenter.overlap_lines);
        override_parsed("LODE_MAX_CHARS", &mut self.segmenter.max_chars);
        override_parsed("LODE_BATCH_SIZE", &mut self.indexer.batch_size);
        override_parsed("LODE_WINDOW_SECONDS", &mut self.indexer.window_seconds);
        override_parsed(
            "LODE_MAX_REQUESTS_PER_WINDOW",
            &mut self.indexer.max_requests_per_window,
        );
        override_parsed("LODE_RETRY_LIMIT", &mut self.indexer.retry_limit);
        if let Ok(v) = std::env::var("LODE_CORPUS_PATH") {
            self.output.corpus_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LODE_INDEX_PATH") {
            self.output.index_path = PathBuf::from(v);
        }
    }

    fn apply_env_overrides_embedding(&mut self) {
        if let Ok(v) = std::env::var("LODE_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid LODE_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("LODE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LODE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
    }

    fn apply_env_secrets(&mut self) {
        if let Some(token) = secret::from_env("LODE_GITHUB_TOKEN") {
            self.secrets.github_token = Some(token);
        }
        if let Some(key) = secret::from_env("LODE_OPENAI_API_KEY") {
            self.secrets.openai_api_key = Some(key);
        }
    }
}
