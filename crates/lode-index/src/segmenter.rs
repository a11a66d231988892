//! Line-window segmentation with a character cap and syntax re-check.

use lode_source::{Corpus, Lang, RawFile, SyntaxValidator};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// One bounded slice of a corpus file that parsed on its own.
///
/// Segments only come out of [`Segmenter`] (or a saved index), so every
/// segment is known to be syntactically valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    index: usize,
    path: String,
    lang: Lang,
    /// 1-based, inclusive.
    line_range: (usize, usize),
    text: String,
    content_hash: String,
}

impl Segment {
    pub(crate) fn new(
        index: usize,
        path: &str,
        lang: Lang,
        line_range: (usize, usize),
        text: String,
    ) -> Self {
        Self {
            index,
            path: path.to_owned(),
            lang,
            line_range,
            content_hash: blake3_hex(&text),
            text,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn lang(&self) -> Lang {
        self.lang
    }

    #[must_use]
    pub fn line_range(&self) -> (usize, usize) {
        self.line_range
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

/// Segmenter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Lines per window (default: 50).
    pub target_lines: usize,
    /// Lines shared with the previous window (default: 10).
    pub overlap_lines: usize,
    /// Character cap per window (default: 1500).
    pub max_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            target_lines: 50,
            overlap_lines: 10,
            max_chars: 1500,
        }
    }
}

impl SegmenterConfig {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] when a window could never advance
    /// or hold any text.
    pub fn validate(&self) -> Result<()> {
        if self.target_lines == 0 {
            return Err(IndexError::InvalidConfig("target_lines must be > 0".into()));
        }
        if self.overlap_lines >= self.target_lines {
            return Err(IndexError::InvalidConfig(format!(
                "overlap_lines ({}) must be smaller than target_lines ({})",
                self.overlap_lines, self.target_lines
            )));
        }
        if self.max_chars == 0 {
            return Err(IndexError::InvalidConfig("max_chars must be > 0".into()));
        }
        Ok(())
    }
}

/// Output of one segmentation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    /// Windows that failed the syntax check.
    pub dropped_invalid: usize,
    /// Windows holding only whitespace.
    pub dropped_empty: usize,
    /// Windows cut short by the character cap.
    pub truncated: usize,
}

pub struct Segmenter {
    config: SegmenterConfig,
    validator: SyntaxValidator,
}

impl Segmenter {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] if `config` is out of range.
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            validator: SyntaxValidator::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split every file of `corpus` into windows, file by file, numbering the
    /// surviving windows from 0 without gaps.
    pub fn segment(&mut self, corpus: &Corpus) -> Segmentation {
        let mut out = Segmentation::default();
        for file in &corpus.files {
            self.segment_file(file, &mut out);
        }
        tracing::info!(
            files = corpus.files.len(),
            segments = out.segments.len(),
            dropped_invalid = out.dropped_invalid,
            dropped_empty = out.dropped_empty,
            truncated = out.truncated,
            "segmentation complete"
        );
        out
    }

    fn segment_file(&mut self, file: &RawFile, out: &mut Segmentation) {
        let lines: Vec<&str> = file.body.lines().collect();
        let mut start = 0;

        while start < lines.len() {
            let window = take_window(&lines[start..], &self.config);
            if window.truncated {
                out.truncated += 1;
            }
            let line_range = (start + 1, start + window.lines);

            if window.text.trim().is_empty() {
                out.dropped_empty += 1;
            } else if let Err(issue) = self.validator.check(file.lang, &window.text) {
                tracing::debug!(
                    path = %file.path,
                    lines = ?line_range,
                    %issue,
                    "dropping malformed window"
                );
                out.dropped_invalid += 1;
            } else {
                let index = out.segments.len();
                out.segments.push(Segment::new(
                    index,
                    &file.path,
                    file.lang,
                    line_range,
                    window.text,
                ));
            }

            if start + window.lines >= lines.len() {
                break;
            }
            start += window
                .lines
                .saturating_sub(self.config.overlap_lines)
                .max(1);
        }
    }
}

/// Segment `corpus` with the given window parameters.
///
/// # Errors
///
/// Returns [`IndexError::InvalidConfig`] if the parameters are out of range.
pub fn segment(
    corpus: &Corpus,
    target_lines: usize,
    overlap_lines: usize,
    max_chars: usize,
) -> Result<Segmentation> {
    let mut segmenter = Segmenter::new(SegmenterConfig {
        target_lines,
        overlap_lines,
        max_chars,
    })?;
    Ok(segmenter.segment(corpus))
}

struct Window {
    text: String,
    /// Source lines covered, always at least one.
    lines: usize,
    truncated: bool,
}

/// Take up to `target_lines` lines, stopping at the last line boundary that
/// keeps the text within `max_chars`. A first line that alone exceeds the cap
/// is cut at the cap.
fn take_window(lines: &[&str], config: &SegmenterConfig) -> Window {
    let wanted = lines.len().min(config.target_lines);
    let mut chars = 0;
    let mut kept = 0;
    for line in &lines[..wanted] {
        let add = line.chars().count() + usize::from(kept > 0);
        if chars + add > config.max_chars {
            break;
        }
        chars += add;
        kept += 1;
    }

    if kept == 0 {
        return Window {
            text: lines[0].chars().take(config.max_chars).collect(),
            lines: 1,
            truncated: true,
        };
    }
    Window {
        text: lines[..kept].join("\n"),
        lines: kept,
        truncated: kept < wanted,
    }
}

fn blake3_hex(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}
