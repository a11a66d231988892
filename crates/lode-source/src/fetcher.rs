//! Deterministic remote tree walk producing a [`Corpus`].
//!
//! The walk runs in two passes. The listing pass uses an explicit work stack:
//! entries of every directory are sorted by name and pushed in reverse, so the
//! pop order is a lexical depth-first pre-order. The body pass fetches every
//! matched file through an order-preserving buffered stream, then decodes and
//! syntax-checks it. Per-file failures end up in [`Corpus::skipped`]; a failed
//! directory listing aborts the fetch.

use std::collections::HashSet;

use base64::Engine as _;
use futures::StreamExt as _;
use tokio_util::sync::CancellationToken;

use crate::corpus::{Corpus, FetchStats, RawFile, SkipReason, SkippedFile};
use crate::error::{Result, SourceError};
use crate::languages::{ExtensionFilter, detect_language};
use crate::locator::RepositoryLocator;
use crate::source::{EntryKind, FileContent, RemoteTreeSource, TreeEntry};
use crate::syntax::SyntaxValidator;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_CONCURRENCY: usize = 4;

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub extensions: ExtensionFilter,
    /// Directories nested deeper than this are skipped. The root is depth 0.
    pub max_depth: usize,
    /// File bodies requested at once.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionFilter::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

enum Work {
    Dir { path: String, depth: usize },
    File(TreeEntry),
}

pub struct TreeFetcher<S> {
    source: S,
    config: FetchConfig,
}

impl<S: RemoteTreeSource> TreeFetcher<S> {
    #[must_use]
    pub fn new(source: S, config: FetchConfig) -> Self {
        Self { source, config }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Walk the tree at `locator` and return every file that passed the
    /// extension filter, decoded and syntax-checked, in lexical depth-first
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::RemoteAccess`] when a directory cannot be
    /// listed and [`SourceError::Cancelled`] when `cancel` fires.
    pub async fn fetch(
        &self,
        locator: &RepositoryLocator,
        cancel: &CancellationToken,
    ) -> Result<Corpus> {
        let mut stats = FetchStats::default();
        let entries = self.list_files(locator, cancel, &mut stats).await?;

        tracing::info!(
            repo = %locator,
            source = self.source.name(),
            dirs = stats.dirs_listed,
            files = entries.len(),
            "tree listed, fetching file bodies"
        );

        let mut bodies = futures::stream::iter(entries.iter().map(|entry| async move {
            (entry, self.source.fetch_file(locator, &entry.path).await)
        }))
        .buffered(self.config.concurrency.max(1));

        let mut validator = SyntaxValidator::new();
        let mut corpus = Corpus {
            locator: Some(locator.clone()),
            ..Corpus::default()
        };

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SourceError::Cancelled),
                next = bodies.next() => next,
            };
            let Some((entry, fetched)) = next else {
                break;
            };
            match accept(entry, fetched, &mut validator) {
                Ok(file) => corpus.files.push(file),
                Err(reason) => {
                    tracing::warn!(path = %entry.path, %reason, "skipping file");
                    corpus.skipped.push(SkippedFile {
                        path: entry.path.clone(),
                        reason,
                    });
                }
            }
        }

        corpus.stats = stats;
        tracing::info!(
            repo = %locator,
            files = corpus.files.len(),
            skipped = corpus.skipped.len(),
            lines = corpus.total_lines(),
            "fetch complete"
        );
        Ok(corpus)
    }

    async fn list_files(
        &self,
        locator: &RepositoryLocator,
        cancel: &CancellationToken,
        stats: &mut FetchStats,
    ) -> Result<Vec<TreeEntry>> {
        let mut stack = vec![Work::Dir {
            path: String::new(),
            depth: 0,
        }];
        let mut visited: HashSet<String> = HashSet::new();
        let mut files = Vec::new();

        while let Some(work) = stack.pop() {
            let (path, depth) = match work {
                Work::File(entry) => {
                    files.push(entry);
                    continue;
                }
                Work::Dir { path, depth } => (path, depth),
            };

            if !visited.insert(path.clone()) {
                tracing::debug!(%path, "directory already visited");
                continue;
            }
            if depth > self.config.max_depth {
                tracing::warn!(%path, depth, max_depth = self.config.max_depth, "directory too deep, skipping");
                stats.dirs_skipped += 1;
                continue;
            }

            let listed = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SourceError::Cancelled),
                listed = self.source.list_dir(locator, &path) => listed,
            };
            let mut entries = listed.map_err(|e| match e {
                e @ SourceError::RemoteAccess { .. } => e,
                other => SourceError::remote(&path, None, other.to_string()),
            })?;
            stats.dirs_listed += 1;
            tracing::debug!(%path, entries = entries.len(), "listed directory");

            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries.into_iter().rev() {
                match entry.kind {
                    EntryKind::Dir => stack.push(Work::Dir {
                        path: entry.path,
                        depth: depth + 1,
                    }),
                    EntryKind::File if self.config.extensions.matches(&entry.name) => {
                        stats.files_matched += 1;
                        stack.push(Work::File(entry));
                    }
                    EntryKind::File => stats.files_filtered_out += 1,
                    EntryKind::Symlink | EntryKind::Submodule => {
                        tracing::debug!(path = %entry.path, kind = ?entry.kind, "not following link");
                        stats.links_ignored += 1;
                    }
                }
            }
        }

        Ok(files)
    }
}

fn accept(
    entry: &TreeEntry,
    fetched: Result<FileContent>,
    validator: &mut SyntaxValidator,
) -> std::result::Result<RawFile, SkipReason> {
    let content = fetched.map_err(|e| SkipReason::Fetch(e.to_string()))?;
    if !content.encoding.eq_ignore_ascii_case("base64") {
        return Err(SkipReason::UnsupportedEncoding(content.encoding));
    }
    let body = decode_content(&entry.path, &content.content)
        .map_err(|e| SkipReason::Decode(e.to_string()))?;
    let lang = detect_language(&entry.path)
        .ok_or_else(|| SkipReason::InvalidSyntax("no language for extension".into()))?;
    validator
        .check(lang, &body)
        .map_err(|e| SkipReason::InvalidSyntax(e.to_string()))?;
    Ok(RawFile::new(entry.path.clone(), lang, body))
}

/// Decode a base64 transport body into UTF-8 text.
///
/// Line breaks inside the payload are ignored and a leading byte-order mark is
/// dropped.
///
/// # Errors
///
/// Returns [`SourceError::Decode`] if the payload is not base64 or the bytes
/// are not UTF-8.
pub fn decode_content(path: &str, content: &str) -> Result<String> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SourceError::Decode {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
    let text = String::from_utf8(bytes).map_err(|e| SourceError::Decode {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(stripped) => stripped.to_owned(),
        None => text,
    })
}
