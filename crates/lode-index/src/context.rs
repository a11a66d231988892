//! Text sent to the embedding service for a segment.
//!
//! The raw window is prefixed with a `File: <path>` line and a language tag so
//! that similar code from different files stays distinguishable.

use crate::segmenter::Segment;

/// Generate text optimized for embedding (not for display).
#[must_use]
pub fn embedding_text(segment: &Segment) -> String {
    let mut text = String::with_capacity(segment.text().len() + segment.path().len() + 32);
    text.push_str("File: ");
    text.push_str(segment.path());
    text.push('\n');
    text.push_str("# Language: ");
    text.push_str(segment.lang().id());
    text.push('\n');
    text.push_str(segment.text());
    text
}

/// Short header for display in search results.
#[must_use]
pub fn display_header(segment: &Segment) -> String {
    let (start, end) = segment.line_range();
    format!("{} (lines {start}-{end})", segment.path())
}
