//! Collaborators the renderer delegates to.
//!
//! Chat-specific text substitutions, syntax highlighting, math typesetting
//! and same-origin detection live outside the Markdown grammar. Each is a
//! trait with a no-op default so the engine works out of the box, and each
//! can be replaced on [`crate::MarkdownEngine`].
use crate::codegen::escape;
use crate::config::FormattingOptions;
use crate::error::{MarkdownError, Result};
use std::collections::HashSet;
use std::fmt::Debug;

/// Chat text formatting applied to every plain text run.
pub trait TextFormatter: Debug + Send + Sync {
    /// Applies chat substitutions (mentions, emoticons, ...) to a text run
    /// that has already been HTML-escaped.
    fn format_text(&self, text: &str, options: &FormattingOptions) -> String;

    /// Makes raw text safe to embed in HTML.
    fn sanitize_html(&self, text: &str) -> String {
        escape(text, true)
    }
}

/// Syntax highlighting for fenced code blocks.
pub trait Highlighter: Debug + Send + Sync {
    /// Language ids this highlighter understands.
    fn known_languages(&self) -> HashSet<String>;

    fn is_known(&self, language: &str) -> bool {
        self.known_languages().contains(language)
    }

    /// Highlights `code`, returning HTML.
    fn highlight(&self, language: &str, code: &str) -> Result<String>;
}

/// Math typesetting for `tex` and `latex` code blocks.
pub trait MathRenderer: Debug + Send + Sync {
    /// Renders LaTeX source in display mode, returning HTML.
    fn render_math(&self, source: &str) -> Result<String>;
}

/// Lookup of the address the application is served from.
pub trait OriginLookup: Debug + Send + Sync {
    /// Prefix that marks an href as same-origin, if known.
    fn current_origin_prefix(&self) -> Option<String>;
}

/// Leaves text runs untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format_text(&self, text: &str, _options: &FormattingOptions) -> String {
        text.to_string()
    }
}

/// Knows no languages; every code block renders unhighlighted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHighlighter;

impl Highlighter for NoHighlighter {
    fn known_languages(&self) -> HashSet<String> {
        HashSet::new()
    }

    fn is_known(&self, _language: &str) -> bool {
        false
    }

    fn highlight(&self, language: &str, _code: &str) -> Result<String> {
        Err(MarkdownError::highlight_error(language, "no highlighter configured"))
    }
}

/// Rejects every input, so math blocks fall back to plain code.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMath;

impl MathRenderer for NoMath {
    fn render_math(&self, _source: &str) -> Result<String> {
        Err(MarkdownError::math_error("no math renderer configured"))
    }
}

/// No known origin: every link opens in a new tab.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOrigin;

impl OriginLookup for NoOrigin {
    fn current_origin_prefix(&self) -> Option<String> {
        None
    }
}

/// A fixed origin prefix such as `https://chat.example.com/team`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOrigin(pub String);

impl OriginLookup for SiteOrigin {
    fn current_origin_prefix(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("diff", "Diff"),
    ("apache", "Apache"),
    ("makefile", "Makefile"),
    ("http", "HTTP"),
    ("json", "JSON"),
    ("markdown", "Markdown"),
    ("javascript", "JavaScript"),
    ("css", "CSS"),
    ("nginx", "nginx"),
    ("objectivec", "Objective-C"),
    ("python", "Python"),
    ("xml", "XML"),
    ("perl", "Perl"),
    ("bash", "Bash"),
    ("php", "PHP"),
    ("coffeescript", "CoffeeScript"),
    ("cs", "C#"),
    ("cpp", "C++"),
    ("sql", "SQL"),
    ("go", "Go"),
    ("ruby", "Ruby"),
    ("java", "Java"),
    ("ini", "ini"),
    ("latex", "LaTeX"),
    ("tex", "TeX"),
    ("rust", "Rust"),
    ("yaml", "YAML"),
    ("swift", "Swift"),
    ("typescript", "TypeScript"),
    ("scala", "Scala"),
];

/// Human-readable label for a highlighter language id.
pub fn language_display_name(language: &str) -> Option<&'static str> {
    LANGUAGE_NAMES
        .iter()
        .find(|(id, _)| *id == language)
        .map(|(_, name)| *name)
}
