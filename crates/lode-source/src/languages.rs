//! Language detection and tree-sitter grammar registry.

use serde::{Deserialize, Serialize};

/// Source language that can be syntax-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
}

impl Lang {
    /// Identifier used in segment payloads and config.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
        }
    }

    /// Get the tree-sitter grammar. Returns `None` if the
    /// corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-rust")]
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            #[cfg(feature = "lang-go")]
            Self::Go => Some(tree_sitter_go::LANGUAGE.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Map an extension to a language, ignoring a leading dot and ASCII case.
#[must_use]
pub fn lang_for_extension(ext: &str) -> Option<Lang> {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "py" | "pyi" => Some(Lang::Python),
        "rs" => Some(Lang::Rust),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        "ts" | "tsx" | "mts" | "cts" => Some(Lang::TypeScript),
        "go" => Some(Lang::Go),
        _ => None,
    }
}

/// Detect language from a slash-separated remote path.
#[must_use]
pub fn detect_language(path: &str) -> Option<Lang> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    lang_for_extension(ext)
}

/// Extension allow-list applied while walking a remote tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter from extensions with or without a leading dot.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Extensions in the list that have no compiled grammar.
    #[must_use]
    pub fn unsupported(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .filter(|e| lang_for_extension(e).and_then(Lang::grammar).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Whether a file name passes the allow-list.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let Some((stem, ext)) = name.rsplit_once('.') else {
            return false;
        };
        !stem.is_empty()
            && self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(["py"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_language_py() {
        assert_eq!(detect_language("pkg/module.py"), Some(Lang::Python));
        assert_eq!(detect_language("stubs/module.pyi"), Some(Lang::Python));
    }

    #[test]
    fn detect_language_js_variants() {
        for ext in &["js", "jsx", "mjs", "cjs"] {
            let path = format!("src/file.{ext}");
            assert_eq!(
                detect_language(&path),
                Some(Lang::JavaScript),
                "failed for .{ext}"
            );
        }
    }

    #[test]
    fn detect_language_ignores_case() {
        assert_eq!(detect_language("src/Main.PY"), Some(Lang::Python));
        assert_eq!(lang_for_extension(".Rs"), Some(Lang::Rust));
        let filter = ExtensionFilter::new(["py"]);
        assert!(filter.matches("Main.PY"));
    }

    #[test]
    fn detect_language_unknown_returns_none() {
        assert_eq!(detect_language("file.xyz"), None);
        assert_eq!(detect_language("Makefile"), None);
        assert_eq!(detect_language("dir/.py"), None);
    }

    #[test]
    fn filter_normalizes_dots_and_case() {
        let filter = ExtensionFilter::new([".PY", "py", " rs "]);
        assert_eq!(filter.extensions(), &["py".to_string(), "rs".to_string()]);
        assert!(filter.matches("setup.py"));
        assert!(filter.matches("Main.PY"));
        assert!(filter.matches("lib.rs"));
        assert!(!filter.matches("notes.md"));
        assert!(!filter.matches(".py"));
        assert!(!filter.matches("py"));
    }

    #[test]
    fn default_filter_is_python_only() {
        let filter = ExtensionFilter::default();
        assert_eq!(filter.extensions(), &["py".to_string()]);
    }

    #[test]
    fn unsupported_lists_unknown_extensions() {
        let filter = ExtensionFilter::new(["py", "cobol"]);
        assert!(filter.unsupported().contains(&"cobol"));
        #[cfg(feature = "lang-python")]
        assert!(!filter.unsupported().contains(&"py"));
    }

    #[test]
    fn lang_id_matches_display() {
        for lang in [
            Lang::Python,
            Lang::Rust,
            Lang::JavaScript,
            Lang::TypeScript,
            Lang::Go,
        ] {
            assert!(!lang.id().is_empty());
            assert_eq!(lang.to_string(), lang.id());
        }
    }

    #[test]
    fn grammar_available_for_default_feature() {
        #[cfg(feature = "lang-python")]
        assert!(Lang::Python.grammar().is_some());
    }
}
