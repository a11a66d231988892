//! Remote repository identification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Revision to read the tree at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum GitRef {
    /// The remote default branch.
    #[default]
    Default,
    Branch(String),
    Commit(String),
}

impl GitRef {
    /// Value for the `ref` query parameter, `None` for the default branch.
    #[must_use]
    pub fn as_query(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Branch(b) => Some(b),
            Self::Commit(c) => Some(c),
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default branch"),
            Self::Branch(b) => write!(f, "branch {b}"),
            Self::Commit(c) => write!(f, "commit {c}"),
        }
    }
}

/// Identifies one remote tree: `owner/name` at a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryLocator {
    owner: String,
    name: String,
    #[serde(default)]
    git_ref: GitRef,
}

impl RepositoryLocator {
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidLocator`] if owner or name is empty or
    /// contains a path separator.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, SourceError> {
        let owner = owner.into();
        let name = name.into();
        for (label, part) in [("owner", &owner), ("name", &name)] {
            if part.trim().is_empty() {
                return Err(SourceError::InvalidLocator(format!("{label} is empty")));
            }
            if part.contains('/') || part.chars().any(char::is_whitespace) {
                return Err(SourceError::InvalidLocator(format!(
                    "{label} '{part}' contains '/' or whitespace"
                )));
            }
        }
        Ok(Self {
            owner,
            name,
            git_ref: GitRef::Default,
        })
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.git_ref = GitRef::Branch(branch.into());
        self
    }

    #[must_use]
    pub fn with_commit(mut self, sha: impl Into<String>) -> Self {
        self.git_ref = GitRef::Commit(sha.into());
        self
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn git_ref(&self) -> &GitRef {
        &self.git_ref
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        match &self.git_ref {
            GitRef::Default => Ok(()),
            GitRef::Branch(b) => write!(f, "@{b}"),
            GitRef::Commit(c) => write!(f, "#{c}"),
        }
    }
}

/// Parses `owner/name`, `owner/name@branch` or `owner/name#commit`.
impl FromStr for RepositoryLocator {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (repo, git_ref) = if let Some((repo, sha)) = s.split_once('#') {
            (repo, Some(GitRef::Commit(sha.to_owned())))
        } else if let Some((repo, branch)) = s.split_once('@') {
            (repo, Some(GitRef::Branch(branch.to_owned())))
        } else {
            (s, None)
        };

        let (owner, name) = repo
            .split_once('/')
            .ok_or_else(|| SourceError::InvalidLocator(format!("expected owner/name, got '{s}'")))?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        let mut locator = Self::new(owner, name)?;

        match git_ref {
            Some(GitRef::Branch(b) | GitRef::Commit(b)) if b.is_empty() => Err(
                SourceError::InvalidLocator(format!("empty revision in '{s}'")),
            ),
            Some(r) => {
                locator.git_ref = r;
                Ok(locator)
            }
            None => Ok(locator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain() {
        let loc: RepositoryLocator = "lion-agi/lionagi".parse().unwrap();
        assert_eq!(loc.owner(), "lion-agi");
        assert_eq!(loc.name(), "lionagi");
        assert_eq!(loc.git_ref(), &GitRef::Default);
        assert_eq!(loc.to_string(), "lion-agi/lionagi");
    }

    #[test]
    fn parse_branch_and_commit() {
        let loc: RepositoryLocator = "a/b@dev".parse().unwrap();
        assert_eq!(loc.git_ref(), &GitRef::Branch("dev".into()));
        assert_eq!(loc.git_ref().as_query(), Some("dev"));

        let loc: RepositoryLocator = "a/b#abc123".parse().unwrap();
        assert_eq!(loc.git_ref(), &GitRef::Commit("abc123".into()));
        assert_eq!(loc.to_string(), "a/b#abc123");
    }

    #[test]
    fn parse_strips_git_suffix() {
        let loc: RepositoryLocator = "a/b.git".parse().unwrap();
        assert_eq!(loc.name(), "b");
    }

    #[test]
    fn parse_rejects_bad_input() {
        for bad in ["", "noslash", "/name", "owner/", "a/b/c", "a/b@", "a/b#"] {
            assert!(
                bad.parse::<RepositoryLocator>().is_err(),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn branch_and_commit_are_exclusive() {
        let loc = RepositoryLocator::new("a", "b")
            .unwrap()
            .with_branch("main")
            .with_commit("deadbeef");
        assert_eq!(loc.git_ref(), &GitRef::Commit("deadbeef".into()));
    }

    #[test]
    fn default_ref_has_no_query() {
        assert_eq!(GitRef::Default.as_query(), None);
    }

    #[test]
    fn serde_roundtrip_keeps_ref() {
        let loc = RepositoryLocator::new("a", "b").unwrap().with_branch("x");
        let json = serde_json::to_string(&loc).unwrap();
        let back: RepositoryLocator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
