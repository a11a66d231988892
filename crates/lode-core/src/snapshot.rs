//! JSON snapshots of a fetched corpus and a built index.

use std::path::Path;

use anyhow::Context;
use lode_index::IndexHandle;
use lode_source::Corpus;

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_corpus(corpus: &Corpus, path: &Path) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_vec_pretty(corpus).context("failed to serialize corpus")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write corpus snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), files = corpus.len(), "corpus snapshot written");
    Ok(())
}

/// # Errors
///
/// Returns an error if the file is missing or not a corpus snapshot.
pub fn load_corpus(path: &Path) -> anyhow::Result<Corpus> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read corpus snapshot {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse corpus snapshot {}", path.display()))
}

/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_index(handle: &IndexHandle, path: &Path) -> anyhow::Result<()> {
    ensure_parent(path)?;
    handle
        .save(path)
        .with_context(|| format!("failed to write index {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = handle.len(), "index written");
    Ok(())
}

/// # Errors
///
/// Returns an error if the file is missing or not an index.
pub fn load_index(path: &Path) -> anyhow::Result<IndexHandle> {
    IndexHandle::load(path).with_context(|| format!("failed to load index {}", path.display()))
}
