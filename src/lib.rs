//! Chat-flavored Markdown to sanitized HTML.
//!
//! The pipeline is a block lexer producing a flat token sequence (with start
//! and end markers for nested constructs), a block parser walking that
//! sequence, an inline lexer for the text inside each block, and a
//! [`Renderer`] producing the HTML fragments.

// Core modules
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;

// Configuration and collaborators
pub mod config;
pub mod extensions;
#[cfg(feature = "syntect")]
pub mod highlight;

pub use codegen::{escape, HtmlRenderer, Renderer};
pub use config::{FormattingOptions, MarkdownEngine, MarkdownOptions, MarkdownOptionsBuilder};
pub use error::{MarkdownError, Result};
pub use extensions::{
    language_display_name, Highlighter, MathRenderer, NoHighlighter, NoMath, NoOrigin,
    OriginLookup, PlainTextFormatter, SiteOrigin, TextFormatter,
};
#[cfg(feature = "syntect")]
pub use highlight::SyntectHighlighter;
pub use lexer::{link_key, Align, BlockLexer, LinkDef, LinkTable, Position, Token, Tokens};
pub use parser::{InlineLexer, Parser};

/// Renders chat Markdown with default options and collaborators.
///
/// # Examples
///
/// ```
/// use chatmark::{format, FormattingOptions};
///
/// let html = format("**hi** <b>there</b>", &FormattingOptions::default()).unwrap();
/// assert_eq!(html, "<p><strong>hi</strong> &lt;b&gt;there&lt;/b&gt;</p>\n");
/// ```
pub fn format(text: &str, options: &FormattingOptions) -> Result<String> {
    MarkdownEngine::new().format(text, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_works() {
        let html = format("# Hello, World!", &FormattingOptions::default()).unwrap();
        assert_eq!(
            html,
            "<h1 id=\"hello-world-\" class=\"markdown__heading\">Hello, World!</h1>"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(format("", &FormattingOptions::default()).unwrap(), "");
    }

    #[test]
    fn test_singleline_preview() {
        let options = FormattingOptions {
            singleline: true,
            ..Default::default()
        };
        let html = format("one  \ntwo", &options).unwrap();
        assert_eq!(
            html,
            "<p class=\"markdown__paragraph-inline\">one two</p>"
        );
    }

    #[test]
    fn test_calls_are_independent() {
        let options = FormattingOptions::default();
        let first = format("[x]: https://example.com\n\n[x]", &options).unwrap();
        assert!(first.contains("href=\"https://example.com\""));
        assert_eq!(format("[x]", &options).unwrap(), "<p>[x]</p>\n");
    }
}
