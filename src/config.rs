//! Configuration and the public Markdown engine.
//!
//! `MarkdownOptions` selects the grammar and output dialect. `FormattingOptions`
//! carries per-message chat settings. `MarkdownEngine` owns both kinds of
//! configuration plus the collaborators and runs lex, parse and render.
use crate::codegen::HtmlRenderer;
use crate::error::Result;
use crate::extensions::{
    Highlighter, MathRenderer, NoHighlighter, NoMath, NoOrigin, OriginLookup, PlainTextFormatter,
    TextFormatter,
};
use crate::lexer::{BlockLexer, Tokens};
use crate::parser::Parser;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grammar and output options, fixed for the lifetime of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkdownOptions {
    /// Escape raw HTML instead of passing it through
    pub sanitize: bool,
    /// GitHub flavored extensions: fences, strikethrough, bare URLs
    pub gfm: bool,
    /// Table grammar (requires `gfm`)
    pub tables: bool,
    pub pedantic: bool,
    /// Split lists when the bullet style changes
    pub smart_lists: bool,
    /// Self-closing void tags
    pub xhtml: bool,
    /// Prefix for generated heading ids
    pub header_prefix: String,
    /// Name of the function images call when they load or fail
    pub image_loaded_callback: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            sanitize: true,
            gfm: true,
            tables: true,
            pedantic: false,
            smart_lists: false,
            xhtml: false,
            header_prefix: String::new(),
            image_loaded_callback: "markdownImageLoaded".to_string(),
        }
    }
}

impl MarkdownOptions {
    /// Creates a builder starting from the defaults.
    pub fn builder() -> MarkdownOptionsBuilder {
        MarkdownOptionsBuilder::new()
    }
}

/// Builder for MarkdownOptions.
#[derive(Debug, Default)]
pub struct MarkdownOptionsBuilder {
    config: MarkdownOptions,
}

impl MarkdownOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sanitize(mut self, enabled: bool) -> Self {
        self.config.sanitize = enabled;
        self
    }

    pub fn gfm(mut self, enabled: bool) -> Self {
        self.config.gfm = enabled;
        self
    }

    pub fn tables(mut self, enabled: bool) -> Self {
        self.config.tables = enabled;
        self
    }

    pub fn pedantic(mut self, enabled: bool) -> Self {
        self.config.pedantic = enabled;
        self
    }

    pub fn smart_lists(mut self, enabled: bool) -> Self {
        self.config.smart_lists = enabled;
        self
    }

    pub fn xhtml(mut self, enabled: bool) -> Self {
        self.config.xhtml = enabled;
        self
    }

    pub fn header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.header_prefix = prefix.into();
        self
    }

    pub fn image_loaded_callback(mut self, callback: impl Into<String>) -> Self {
        self.config.image_loaded_callback = callback.into();
        self
    }

    /// Builds the final options.
    pub fn build(self) -> MarkdownOptions {
        self.config
    }
}

/// Per-message chat formatting settings.
///
/// Only `singleline` is read by the renderer. The remaining fields are handed
/// to the [`TextFormatter`] untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormattingOptions {
    /// Render paragraphs and line breaks as spaces (message previews)
    pub singleline: bool,
    pub emoticons: bool,
    pub mention_highlight: bool,
    pub mention_keys: Vec<String>,
}

/// Chat Markdown renderer.
///
/// # Examples
///
/// ```
/// use chatmark::{FormattingOptions, MarkdownEngine, MarkdownOptions};
///
/// let engine = MarkdownEngine::with_options(
///     MarkdownOptions::builder().header_prefix("msg-").build(),
/// );
/// let html = engine.format("# Hi", &FormattingOptions::default()).unwrap();
/// assert!(html.contains("id=\"msg-hi\""));
/// ```
#[derive(Debug)]
pub struct MarkdownEngine {
    options: MarkdownOptions,
    formatter: Box<dyn TextFormatter>,
    highlighter: Box<dyn Highlighter>,
    math: Box<dyn MathRenderer>,
    origin: Box<dyn OriginLookup>,
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownEngine {
    /// Creates an engine with default options and no-op collaborators.
    pub fn new() -> Self {
        Self::with_options(MarkdownOptions::default())
    }

    pub fn with_options(options: MarkdownOptions) -> Self {
        Self {
            options,
            formatter: Box::new(PlainTextFormatter),
            highlighter: Box::new(NoHighlighter),
            math: Box::new(NoMath),
            origin: Box::new(NoOrigin),
        }
    }

    pub fn with_formatter(mut self, formatter: impl TextFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Box::new(highlighter);
        self
    }

    pub fn with_math(mut self, math: impl MathRenderer + 'static) -> Self {
        self.math = Box::new(math);
        self
    }

    pub fn with_origin(mut self, origin: impl OriginLookup + 'static) -> Self {
        self.origin = Box::new(origin);
        self
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Lexes `text` into block tokens and the link definition table.
    pub fn lex(&self, text: &str) -> Result<Tokens> {
        BlockLexer::new(&self.options).lex(text)
    }

    /// Renders a previously lexed token sequence.
    pub fn render_tokens(&self, tokens: &Tokens, formatting: &FormattingOptions) -> Result<String> {
        let renderer = HtmlRenderer::new(&self.options, formatting)
            .with_formatter(self.formatter.as_ref())
            .with_highlighter(self.highlighter.as_ref())
            .with_math(self.math.as_ref())
            .with_origin(self.origin.current_origin_prefix());
        let html = Parser::new(tokens, &renderer).parse()?;
        debug!(
            tokens = tokens.len(),
            singleline = formatting.singleline,
            "rendered message"
        );
        Ok(html)
    }

    /// Converts chat Markdown to sanitized HTML.
    ///
    /// Every call owns its own lexer, parser and link table. A grammar
    /// failure aborts the render; collaborator failures fall back to plain
    /// output.
    pub fn format(&self, text: &str, formatting: &FormattingOptions) -> Result<String> {
        let tokens = self.lex(text)?;
        self.render_tokens(&tokens, formatting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarkdownError;
    use crate::extensions::SiteOrigin;
    use crate::lexer::Token;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Shouting;

    impl TextFormatter for Shouting {
        fn format_text(&self, text: &str, _options: &FormattingOptions) -> String {
            text.to_uppercase()
        }
    }

    #[derive(Debug)]
    struct Doubling;

    impl MathRenderer for Doubling {
        fn render_math(&self, source: &str) -> Result<String> {
            if source.is_empty() {
                return Err(MarkdownError::math_error("empty"));
            }
            Ok(format!("<span class=\"katex\">{source}{source}</span>"))
        }
    }

    #[test]
    fn test_default_options() {
        let options = MarkdownOptions::default();
        assert!(options.sanitize);
        assert!(options.gfm);
        assert!(options.tables);
        assert!(!options.pedantic);
        assert!(!options.smart_lists);
        assert!(!options.xhtml);
        assert_eq!(options.header_prefix, "");
        assert_eq!(options.image_loaded_callback, "markdownImageLoaded");
    }

    #[test]
    fn test_builder() {
        let options = MarkdownOptions::builder()
            .sanitize(false)
            .gfm(false)
            .pedantic(true)
            .xhtml(true)
            .header_prefix("p-")
            .image_loaded_callback("loaded")
            .build();
        assert!(!options.sanitize);
        assert!(!options.gfm);
        assert!(options.pedantic);
        assert!(options.xhtml);
        assert_eq!(options.header_prefix, "p-");
        assert_eq!(options.image_loaded_callback, "loaded");
    }

    #[test]
    fn test_lex_then_render() {
        let engine = MarkdownEngine::new();
        let tokens = engine.lex("hello\n\n---").unwrap();
        assert_eq!(
            tokens.tokens,
            vec![
                Token::Paragraph {
                    text: "hello".to_string()
                },
                Token::Hr,
            ]
        );
        let html = engine
            .render_tokens(&tokens, &FormattingOptions::default())
            .unwrap();
        assert_eq!(html, "<p>hello</p>\n<hr>\n");
    }

    #[test]
    fn test_formatter_is_applied_to_text_runs() {
        let engine = MarkdownEngine::new().with_formatter(Shouting);
        let html = engine
            .format("hi `code`", &FormattingOptions::default())
            .unwrap();
        assert_eq!(html, "<p>HI <code>code</code></p>\n");
    }

    #[test]
    fn test_math_collaborator() {
        let engine = MarkdownEngine::new().with_math(Doubling);
        let html = engine
            .format("```latex\nx\n```", &FormattingOptions::default())
            .unwrap();
        assert_eq!(
            html,
            "<div class=\"post-body--code tex\"><span class=\"katex\">xx</span></div>"
        );
    }

    #[test]
    fn test_origin_lookup() {
        let engine = MarkdownEngine::new().with_origin(SiteOrigin("https://chat.example.com".into()));
        let html = engine
            .format(
                "https://chat.example.com/team/pl/1",
                &FormattingOptions::default(),
            )
            .unwrap();
        assert!(!html.contains("target=\"_blank\""));
    }
}
