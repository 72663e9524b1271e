//! Syntax highlighting backed by syntect's bundled grammars.
use crate::error::{MarkdownError, Result};
use crate::extensions::Highlighter;
use std::collections::HashSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hljs-" };

/// Highlighter emitting `<span class="hljs-...">` markup.
#[derive(Debug)]
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    fn syntax(&self, language: &str) -> Option<&SyntaxReference> {
        self.syntaxes.find_syntax_by_token(syntect_token(language))
    }
}

/// Maps a highlighter language id to the token syntect indexes it under.
fn syntect_token(language: &str) -> &str {
    match language {
        "bash" => "sh",
        "coffeescript" => "coffee",
        "javascript" => "js",
        "markdown" => "md",
        "objectivec" => "m",
        "perl" => "pl",
        "python" => "py",
        "ruby" => "rb",
        "rust" => "rs",
        other => other,
    }
}

impl Highlighter for SyntectHighlighter {
    fn known_languages(&self) -> HashSet<String> {
        self.syntaxes
            .syntaxes()
            .iter()
            .flat_map(|syntax| syntax.file_extensions.iter())
            .map(|ext| ext.to_lowercase())
            .collect()
    }

    fn is_known(&self, language: &str) -> bool {
        self.syntax(language).is_some()
    }

    fn highlight(&self, language: &str, code: &str) -> Result<String> {
        let syntax = self
            .syntax(language)
            .ok_or_else(|| MarkdownError::highlight_error(language, "unknown language"))?;

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| MarkdownError::highlight_error(language, err.to_string()))?;
        }
        Ok(generator.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages() {
        let highlighter = SyntectHighlighter::new();
        assert!(highlighter.is_known("rust"));
        assert!(highlighter.is_known("python"));
        assert!(!highlighter.is_known("brainfuck"));
        assert!(highlighter.known_languages().contains("rs"));
    }

    #[test]
    fn test_highlight_emits_spans() {
        let highlighter = SyntectHighlighter::new();
        let html = highlighter.highlight("rust", "fn main() {}\n").unwrap();
        assert!(html.contains("<span class=\"hljs-"));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_unknown_language_is_an_error() {
        let err = SyntectHighlighter::new()
            .highlight("brainfuck", "+++")
            .unwrap_err();
        assert!(err.is_recoverable());
    }
}
