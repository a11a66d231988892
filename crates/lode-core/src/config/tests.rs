use std::io::Write;
use std::path::PathBuf;

use serial_test::serial;

use super::*;
use crate::secret::Secret;

const ENV_KEYS: [&str; 18] = [
    "LODE_GITHUB_API_URL",
    "LODE_EXTENSIONS",
    "LODE_MAX_DEPTH",
    "LODE_FETCH_CONCURRENCY",
    "LODE_TARGET_LINES",
    "LODE_OVERLAP_LINES",
    "LODE_MAX_CHARS",
    "LODE_BATCH_SIZE",
    "LODE_WINDOW_SECONDS",
    "LODE_MAX_REQUESTS_PER_WINDOW",
    "LODE_RETRY_LIMIT",
    "LODE_CORPUS_PATH",
    "LODE_INDEX_PATH",
    "LODE_EMBEDDING_PROVIDER",
    "LODE_EMBEDDING_BASE_URL",
    "LODE_EMBEDDING_MODEL",
    "LODE_GITHUB_TOKEN",
    "LODE_OPENAI_API_KEY",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lode.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    (dir, path)
}

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.source.api_url, "https://api.github.com");
    assert_eq!(config.source.extensions, vec!["py".to_string()]);
    assert_eq!(config.segmenter.target_lines, 50);
    assert_eq!(config.segmenter.overlap_lines, 10);
    assert_eq!(config.segmenter.max_chars, 1500);
    assert_eq!(config.indexer.batch_size, 500);
    assert_eq!(config.indexer.window_seconds, 60);
    assert_eq!(config.indexer.max_requests_per_window, 500);
    assert_eq!(config.indexer.retry_limit, 3);
    assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
    assert_eq!(config.embedding.model, "text-embedding-3-small");
    assert!(config.embedding.base_url.is_none());
    assert_eq!(config.output.index_path, PathBuf::from("data/index.json"));
    assert!(config.secrets.github_token.is_none());
    config.validate().unwrap();
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.indexer.batch_size, 500);
    assert_eq!(config.source.concurrency, 4);
}

#[test]
#[serial]
fn parse_valid_toml() {
    let (_dir, path) = write_config(
        r#"
[source]
extensions = ["py", "pyi"]
max_depth = 8

[segmenter]
target_lines = 30
overlap_lines = 5

[indexer]
batch_size = 100
window_seconds = 30
max_requests_per_window = 20
retry_base_delay_ms = 250

[embedding]
provider = "ollama"
base_url = "http://localhost:11434"
model = "nomic-embed-text"

[output]
index_path = "out/index.json"
"#,
    );

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.source.extensions, vec!["py", "pyi"]);
    assert_eq!(config.source.max_depth, 8);
    assert_eq!(config.segmenter.target_lines, 30);
    assert_eq!(config.segmenter.overlap_lines, 5);
    assert_eq!(config.segmenter.max_chars, 1500);
    assert_eq!(config.indexer.batch_size, 100);
    assert_eq!(config.indexer.retry_limit, 3);
    assert_eq!(config.embedding.provider, ProviderKind::Ollama);
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(
        config.embedding.base_url.as_deref(),
        Some("http://localhost:11434")
    );
    assert_eq!(config.output.index_path, PathBuf::from("out/index.json"));
    assert_eq!(config.output.corpus_path, PathBuf::from("data/corpus.json"));

    let indexer = config.indexer.to_indexer_config();
    assert_eq!(indexer.rate_limit.window_seconds, 30);
    assert_eq!(indexer.rate_limit.max_requests_per_window, 20);
    assert_eq!(indexer.retry_base_delay, std::time::Duration::from_millis(250));
}

#[test]
#[serial]
fn malformed_toml_is_an_error() {
    let (_dir, path) = write_config("[indexer\nbatch_size = ");
    clear_env();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides_file_values() {
    let (_dir, path) = write_config(
        r"
[indexer]
batch_size = 100
",
    );

    clear_env();
    unsafe {
        std::env::set_var("LODE_BATCH_SIZE", "25");
        std::env::set_var("LODE_EXTENSIONS", "py, pyi ,");
        std::env::set_var("LODE_MAX_REQUESTS_PER_WINDOW", "7");
        std::env::set_var("LODE_TARGET_LINES", "40");
        std::env::set_var("LODE_EMBEDDING_PROVIDER", "ollama");
        std::env::set_var("LODE_EMBEDDING_MODEL", "all-minilm");
        std::env::set_var("LODE_INDEX_PATH", "/tmp/lode/index.json");
    }

    let config = Config::load(&path).unwrap();
    clear_env();

    assert_eq!(config.indexer.batch_size, 25);
    assert_eq!(config.source.extensions, vec!["py", "pyi"]);
    assert_eq!(config.indexer.max_requests_per_window, 7);
    assert_eq!(config.segmenter.target_lines, 40);
    assert_eq!(config.embedding.provider, ProviderKind::Ollama);
    assert_eq!(config.embedding.model, "all-minilm");
    assert_eq!(
        config.output.index_path,
        PathBuf::from("/tmp/lode/index.json")
    );
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("LODE_BATCH_SIZE", "lots");
        std::env::set_var("LODE_RETRY_LIMIT", "-1");
        std::env::set_var("LODE_EMBEDDING_PROVIDER", "carrier-pigeon");
    }

    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    clear_env();

    assert_eq!(config.indexer.batch_size, 500);
    assert_eq!(config.indexer.retry_limit, 3);
    assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
}

#[test]
#[serial]
fn secrets_come_from_env_only() {
    let (_dir, path) = write_config(
        r#"
[source]
api_url = "https://ghe.example.com/api/v3"
"#,
    );

    clear_env();
    unsafe {
        std::env::set_var("LODE_GITHUB_TOKEN", "ghp_secret");
        std::env::set_var("LODE_OPENAI_API_KEY", "   ");
    }

    let config = Config::load(&path).unwrap();
    clear_env();

    assert_eq!(
        config.secrets.github_token.as_ref().map(Secret::expose),
        Some("ghp_secret")
    );
    assert!(config.secrets.openai_api_key.is_none());
    assert!(!format!("{config:?}").contains("ghp_secret"));
    config.github_source().unwrap();
}

#[test]
fn validate_rejects_overlap_not_below_target() {
    let mut config = Config::default();
    config.segmenter.overlap_lines = config.segmenter.target_lines;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_batch_size() {
    let mut config = Config::default();
    config.indexer.batch_size = 0;
    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("batch_size"));
}

#[test]
fn validate_rejects_zero_request_budget() {
    let mut config = Config::default();
    config.indexer.max_requests_per_window = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_concurrency() {
    let mut config = Config::default();
    config.source.concurrency = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_empty_and_unknown_extensions() {
    let mut config = Config::default();
    config.source.extensions.clear();
    assert!(config.validate().is_err());

    config.source.extensions = vec!["py".into(), "cobol".into()];
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("cobol"));
}

#[test]
fn fetch_config_mirrors_source_section() {
    let mut config = Config::default();
    config.source.extensions = vec![".py".into()];
    config.source.max_depth = 3;
    config.source.concurrency = 2;
    let fetch = config.fetch_config();
    assert!(fetch.extensions.matches("main.py"));
    assert!(!fetch.extensions.matches("README.md"));
    assert_eq!(fetch.max_depth, 3);
    assert_eq!(fetch.concurrency, 2);
}

#[test]
fn github_source_rejects_bad_url() {
    let mut config = Config::default();
    config.source.api_url = "not a url".into();
    assert!(config.github_source().is_err());
}

#[test]
fn openai_embedder_requires_key() {
    let config = Config::default();
    let err = config.build_embedder().unwrap_err();
    assert!(err.to_string().contains("LODE_OPENAI_API_KEY"));
}

#[test]
fn openai_embedder_built_with_key() {
    let mut config = Config::default();
    config.secrets.openai_api_key = Some(Secret::new("sk-test"));
    assert!(matches!(
        config.build_embedder().unwrap(),
        lode_llm::AnyEmbedder::OpenAi(_)
    ));
}

#[test]
fn ollama_embedder_needs_no_key() {
    let mut config = Config::default();
    config.embedding.provider = ProviderKind::Ollama;
    assert!(matches!(
        config.build_embedder().unwrap(),
        lode_llm::AnyEmbedder::Ollama(_)
    ));
}

#[test]
#[serial]
fn shipped_default_config_matches_builtin_defaults() {
    clear_env();
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
    let config = Config::load(&path).unwrap();
    let builtin = Config::default();
    assert_eq!(config.source.extensions, builtin.source.extensions);
    assert_eq!(config.segmenter, builtin.segmenter);
    assert_eq!(config.indexer.batch_size, builtin.indexer.batch_size);
    assert_eq!(
        config.indexer.max_requests_per_window,
        builtin.indexer.max_requests_per_window
    );
    assert_eq!(config.embedding.model, builtin.embedding.model);
    assert_eq!(config.output.index_path, builtin.output.index_path);
    config.validate().unwrap();
}
