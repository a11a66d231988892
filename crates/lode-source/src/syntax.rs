//! Cheap syntactic well-formedness check backed by tree-sitter.
//!
//! A text is well-formed when its parse tree contains no `ERROR` or `MISSING`
//! nodes. This says nothing about whether the code would compile or run.

use std::collections::HashMap;

use tree_sitter::{Node, Parser};

use crate::languages::Lang;

/// Why a text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxIssue {
    #[error("no grammar compiled in for {0}")]
    NoGrammar(Lang),
    #[error("grammar for {lang} rejected by parser: {reason}")]
    Grammar { lang: Lang, reason: String },
    #[error("parser produced no tree")]
    NoTree,
    #[error("malformed {lang} near line {line}")]
    Malformed { lang: Lang, line: usize },
}

/// Reusable parsers, one per language.
#[derive(Default)]
pub struct SyntaxValidator {
    parsers: HashMap<Lang, Parser>,
}

impl std::fmt::Debug for SyntaxValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxValidator")
            .field("languages", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SyntaxValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` as `lang` and report the first syntax problem, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxIssue`] when the grammar is unavailable or the text
    /// does not parse cleanly.
    pub fn check(&mut self, lang: Lang, text: &str) -> Result<(), SyntaxIssue> {
        let parser = self.parser_for(lang)?;
        let tree = parser.parse(text, None).ok_or(SyntaxIssue::NoTree)?;
        match first_error(tree.root_node()) {
            Some(node) => Err(SyntaxIssue::Malformed {
                lang,
                line: node.start_position().row + 1,
            }),
            None => Ok(()),
        }
    }

    /// Convenience wrapper returning a plain verdict.
    pub fn is_well_formed(&mut self, lang: Lang, text: &str) -> bool {
        self.check(lang, text).is_ok()
    }

    fn parser_for(&mut self, lang: Lang) -> Result<&mut Parser, SyntaxIssue> {
        if !self.parsers.contains_key(&lang) {
            let grammar = lang.grammar().ok_or(SyntaxIssue::NoGrammar(lang))?;
            let mut parser = Parser::new();
            parser
                .set_language(&grammar)
                .map_err(|e| SyntaxIssue::Grammar {
                    lang,
                    reason: e.to_string(),
                })?;
            self.parsers.insert(lang, parser);
        }
        self.parsers.get_mut(&lang).ok_or(SyntaxIssue::NoGrammar(lang))
    }
}

fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !cursor.goto_first_child() {
            return Some(node);
        }
        while !cursor.node().has_error() {
            if !cursor.goto_next_sibling() {
                return Some(node);
            }
        }
    }
}

#[cfg(all(test, feature = "lang-python"))]
mod tests {
    use super::*;

    #[test]
    fn valid_python_passes() {
        let mut v = SyntaxValidator::new();
        let src = "import os\n\ndef hello(name):\n    return f\"hi {name}\"\n";
        assert!(v.check(Lang::Python, src).is_ok());
    }

    #[test]
    fn empty_text_is_well_formed() {
        let mut v = SyntaxValidator::new();
        assert!(v.is_well_formed(Lang::Python, ""));
    }

    #[test]
    fn unterminated_call_is_rejected() {
        let mut v = SyntaxValidator::new();
        let src = "x = 1\ny = compute(1,\n";
        let err = v.check(Lang::Python, src).unwrap_err();
        assert!(matches!(err, SyntaxIssue::Malformed { lang: Lang::Python, .. }));
    }

    #[test]
    fn malformed_reports_line() {
        let mut v = SyntaxValidator::new();
        let src = "a = 1\nb = 2\ndef broken(:\n    pass\n";
        match v.check(Lang::Python, src) {
            Err(SyntaxIssue::Malformed { line, .. }) => assert!(line >= 3, "line {line}"),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn parser_is_reused_across_checks() {
        let mut v = SyntaxValidator::new();
        assert!(v.is_well_formed(Lang::Python, "a = 1\n"));
        assert!(v.is_well_formed(Lang::Python, "b = 2\n"));
        assert_eq!(v.parsers.len(), 1);
    }

    #[cfg(not(feature = "lang-go"))]
    #[test]
    fn missing_grammar_is_reported() {
        let mut v = SyntaxValidator::new();
        assert_eq!(
            v.check(Lang::Go, "package main\n"),
            Err(SyntaxIssue::NoGrammar(Lang::Go))
        );
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn unterminated_rust_block_is_rejected() {
        let mut v = SyntaxValidator::new();
        assert!(!v.is_well_formed(Lang::Rust, "fn main() {\n    let x = 1;\n"));
    }
}
