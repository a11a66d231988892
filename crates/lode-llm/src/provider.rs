use std::future::Future;

use crate::error::{LlmError, Result};

/// Sender for human-readable progress messages (retries, throttling).
pub type StatusTx = tokio::sync::mpsc::UnboundedSender<String>;

pub trait EmbeddingProvider: Send + Sync {
    /// Embed every text of a batch in one downstream call.
    ///
    /// The returned vectors are in input order, one per text.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails or answers with a different
    /// number of vectors than requested.
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    fn name(&self) -> &str;
}

/// Check that a provider answered with one vector per input.
pub(crate) fn ensure_count(
    provider: &str,
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>> {
    if expected > 0 && vectors.is_empty() {
        return Err(LlmError::EmptyResponse {
            provider: provider.into(),
        });
    }
    if vectors.len() != expected {
        return Err(LlmError::CountMismatch {
            provider: provider.into(),
            expected,
            got: vectors.len(),
        });
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_count_accepts_matching() {
        let v = ensure_count("t", 2, vec![vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn ensure_count_empty_is_empty_response() {
        let err = ensure_count("t", 3, vec![]).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[test]
    fn ensure_count_mismatch() {
        let err = ensure_count("t", 3, vec![vec![0.0]]).unwrap_err();
        assert!(matches!(
            err,
            LlmError::CountMismatch {
                expected: 3,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn ensure_count_zero_inputs() {
        assert!(ensure_count("t", 0, vec![]).unwrap().is_empty());
    }
}
