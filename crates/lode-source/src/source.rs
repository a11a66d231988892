//! Remote tree source abstraction.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::locator::RepositoryLocator;

/// Kind of a directory entry as reported by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    /// Transport encoding when the listing already reports it.
    #[serde(default)]
    pub encoding: Option<String>,
}

/// A file body as delivered by the remote, still transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    /// Declared transport encoding, e.g. `base64` or `none`.
    pub encoding: String,
    #[serde(default)]
    pub content: String,
}

/// Read-only access to a remote file tree.
///
/// Implementations must consume any pagination internally: `list_dir`
/// returns every entry of the directory.
pub trait RemoteTreeSource: Send + Sync {
    /// List the entries of the directory at `path` (empty string for the root)
    /// in the tree identified by `locator`, at its revision.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::RemoteAccess`](crate::SourceError::RemoteAccess)
    /// when the directory cannot be listed.
    fn list_dir(
        &self,
        locator: &RepositoryLocator,
        path: &str,
    ) -> impl Future<Output = Result<Vec<TreeEntry>>> + Send;

    /// Fetch the content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be retrieved.
    fn fetch_file(
        &self,
        locator: &RepositoryLocator,
        path: &str,
    ) -> impl Future<Output = Result<FileContent>> + Send;

    fn name(&self) -> &str;
}
