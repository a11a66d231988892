//! In-memory vector index over embedded segments.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AttemptError, Result};
use crate::segmenter::Segment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedSegment {
    pub segment: Segment,
    pub vector: Vec<f32>,
}

/// One search result, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub score: f32,
    pub segment: &'a Segment,
}

/// Grows by whole batches; entries are never removed or rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexHandle {
    dimension: Option<usize>,
    entries: Vec<IndexedSegment>,
}

impl IndexHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimension, fixed by the first appended batch.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexedSegment] {
        &self.entries
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.entries.iter().map(|e| &e.segment)
    }

    /// Append one embedded batch. Nothing is added unless every vector is
    /// accepted.
    pub(crate) fn append_batch(
        &mut self,
        segments: &[Segment],
        vectors: Vec<Vec<f32>>,
    ) -> std::result::Result<(), AttemptError> {
        if vectors.len() != segments.len() {
            return Err(AttemptError::CountMismatch {
                expected: segments.len(),
                got: vectors.len(),
            });
        }
        let expected = self
            .dimension
            .or_else(|| vectors.first().map(Vec::len))
            .unwrap_or_default();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected || v.is_empty()) {
            return Err(AttemptError::Dimension {
                expected,
                got: bad.len(),
            });
        }
        if !vectors.is_empty() {
            self.dimension = Some(expected);
        }
        self.entries.extend(
            segments
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(segment, vector)| IndexedSegment { segment, vector }),
        );
        Ok(())
    }

    /// Rank entries by cosine similarity to `query`.
    #[must_use]
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<SearchHit<'_>> {
        let mut hits: Vec<SearchHit<'_>> = self
            .entries
            .iter()
            .map(|e| SearchHit {
                score: cosine_similarity(query, &e.vector),
                segment: &e.segment,
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        hits
    }

    /// Write the index as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), entries = self.len(), "index saved");
        Ok(())
    }

    /// Read an index previously written by [`IndexHandle::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
