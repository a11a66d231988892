//! Error types for lode-index.

/// Why one attempt at embedding a batch was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// The embedding service reported a failure.
    #[error(transparent)]
    Embed(#[from] lode_llm::LlmError),

    /// The service answered with the wrong number of vectors.
    #[error("expected {expected} vectors, got {got}")]
    CountMismatch { expected: usize, got: usize },

    /// A vector does not match the dimension already in the index.
    #[error("vector dimension {got} does not match index dimension {expected}")]
    Dimension { expected: usize, got: usize },
}

/// Errors that can occur during segmentation and indexing.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The first batch could not be indexed, so nothing usable was built.
    #[error("index build failed at batch {batch} after {attempts} attempts: {source}")]
    IndexBuild {
        batch: usize,
        attempts: u32,
        #[source]
        source: AttemptError,
    },

    /// Segmenter or indexer parameters are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error reading or writing a saved index.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
