//! Error types for lode-source.

/// Errors that can occur while walking and fetching a remote source tree.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The remote tree (or one directory in it) could not be listed.
    #[error("remote access failed for '{path}': {reason}")]
    RemoteAccess {
        path: String,
        status: Option<u16>,
        reason: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file body could not be decoded to text.
    #[error("decode failed for '{path}': {reason}")]
    Decode { path: String, reason: String },

    /// The remote API kept answering 429 after all retries.
    #[error("rate limited by remote source")]
    RateLimited,

    /// Repository locator could not be parsed.
    #[error("invalid repository locator: {0}")]
    InvalidLocator(String),

    /// Configured base URL is not usable.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    /// The walk was cancelled from outside.
    #[error("fetch cancelled")]
    Cancelled,
}

impl SourceError {
    pub(crate) fn remote(path: &str, status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::RemoteAccess {
            path: path.to_owned(),
            status,
            reason: reason.into(),
        }
    }
}

/// Result type alias using `SourceError`.
pub type Result<T> = std::result::Result<T, SourceError>;
