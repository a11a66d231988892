//! Remote source tree access for lode.
//!
//! [`TreeFetcher`] walks a [`RemoteTreeSource`] (GitHub contents API by
//! default), keeps files matching an extension allow-list, decodes them and
//! drops anything that does not parse. The result is a [`Corpus`] in a stable
//! lexical depth-first order.

pub mod corpus;
pub mod error;
pub mod fetcher;
pub mod github;
pub(crate) mod http;
pub mod languages;
pub mod locator;
pub mod source;
pub mod syntax;

pub use corpus::{Corpus, FetchStats, RawFile, SkipReason, SkippedFile};
pub use error::{Result, SourceError};
pub use fetcher::{FetchConfig, TreeFetcher, decode_content};
pub use github::GitHubSource;
pub use languages::{ExtensionFilter, Lang, detect_language, lang_for_extension};
pub use locator::{GitRef, RepositoryLocator};
pub use source::{EntryKind, FileContent, RemoteTreeSource, TreeEntry};
pub use syntax::{SyntaxIssue, SyntaxValidator};
