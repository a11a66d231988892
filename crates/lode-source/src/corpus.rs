//! Fetched file bodies and the per-file skip ledger.

use serde::{Deserialize, Serialize};

use crate::languages::Lang;
use crate::locator::RepositoryLocator;

/// One decoded, syntax-checked source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFile {
    pub path: String,
    pub lang: Lang,
    pub body: String,
}

impl RawFile {
    #[must_use]
    pub fn new(path: impl Into<String>, lang: Lang, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lang,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.body.lines().count()
    }
}

/// Why a file was left out of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Transport encoding other than base64.
    UnsupportedEncoding(String),
    /// Body was not valid base64 or not UTF-8.
    Decode(String),
    /// Decoded text failed the syntax check.
    InvalidSyntax(String),
    /// The content request itself failed.
    Fetch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedEncoding(e) => write!(f, "unsupported encoding '{e}'"),
            Self::Decode(e) => write!(f, "decode failed: {e}"),
            Self::InvalidSyntax(e) => write!(f, "invalid syntax: {e}"),
            Self::Fetch(e) => write!(f, "fetch failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Counters collected during one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub dirs_listed: usize,
    pub dirs_skipped: usize,
    pub files_matched: usize,
    pub files_filtered_out: usize,
    pub links_ignored: usize,
}

/// Result of fetching one repository snapshot, in deterministic walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub locator: Option<RepositoryLocator>,
    pub files: Vec<RawFile>,
    #[serde(default)]
    pub skipped: Vec<SkippedFile>,
    #[serde(default)]
    pub stats: FetchStats,
}

impl Corpus {
    /// Corpus built from already-fetched files, with no remote origin.
    #[must_use]
    pub fn from_files(files: Vec<RawFile>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.files.iter().map(RawFile::line_count).sum()
    }

    /// All bodies joined into one text, each preceded by a `File: <path>` line.
    #[must_use]
    pub fn concatenated(&self) -> String {
        let mut out = String::with_capacity(self.files.iter().map(|f| f.body.len() + 16).sum());
        for file in &self.files {
            out.push_str("File: ");
            out.push_str(&file.path);
            out.push('\n');
            out.push_str(&file.body);
            if !file.body.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}
