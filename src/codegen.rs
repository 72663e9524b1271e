//! HTML generation.
//!
//! The [`Renderer`] trait has one method per Markdown construct and returns
//! HTML fragments. Its provided methods emit plain HTML; [`HtmlRenderer`]
//! overrides the constructs that chat posts style differently and wires in
//! the collaborators from [`crate::extensions`].
use crate::config::{FormattingOptions, MarkdownOptions};
use crate::extensions::{
    language_display_name, Highlighter, MathRenderer, NoHighlighter, NoMath, PlainTextFormatter,
    TextFormatter,
};
use crate::lexer::Align;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

lazy_static! {
    static ref ENTITY: Regex = Regex::new(r"^#?[A-Za-z0-9_]+;").unwrap();
    static ref NON_WORD: Regex = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
    static ref SCHEME: Regex = Regex::new(r"(?i)[a-z+.-]+:").unwrap();
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"(?i)&(#(?:\d+|x[0-9a-f]+)|colon);?").unwrap();
}

/// Schemes that run script when followed.
const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Escapes HTML special characters.
///
/// With `encode` off, ampersands that already start an entity such as
/// `&amp;` or `&#39;` are left alone so text is not double-escaped.
pub fn escape(text: &str, encode: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, c) in text.char_indices() {
        match c {
            '&' if !encode && ENTITY.is_match(&text[idx + 1..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Decodes numeric entities and `&colon;`.
fn unescape(text: &str) -> String {
    NUMERIC_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = caps[1].to_ascii_lowercase();
            let code = match entity.strip_prefix("#x") {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => match entity.strip_prefix('#') {
                    Some(dec) => dec.parse().ok(),
                    None => Some(u32::from(':')),
                },
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Decodes `%XX` sequences, keeping malformed ones as they are.
fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &bytes[i + 1..i + 3];
            if hex.iter().all(u8::is_ascii_hexdigit) {
                let byte = hex.iter().fold(0u8, |acc, digit| {
                    acc * 16 + (*digit as char).to_digit(16).unwrap_or(0) as u8
                });
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Whether an (escaped) href would run script when followed.
pub fn is_script_href(href: &str) -> bool {
    let decoded = percent_decode(&unescape(href));
    let scheme: String = decoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == ':')
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|s| scheme.starts_with(s))
}

/// Builds a heading id: lowercased raw text with every run of non-word
/// characters collapsed to `-`.
pub fn heading_id(prefix: &str, raw: &str) -> String {
    format!("{prefix}{}", NON_WORD.replace_all(&raw.to_lowercase(), "-"))
}

/// Renders Markdown constructs to HTML fragments.
///
/// Every argument named `text`, `body` or `content` is already rendered
/// HTML. `code` arguments are raw source.
pub trait Renderer {
    fn options(&self) -> &MarkdownOptions;

    fn code(&self, code: &str, lang: Option<&str>) -> String {
        match lang {
            Some(lang) => format!(
                "<pre><code class=\"lang-{}\">{}</code></pre>\n",
                escape(lang, true),
                escape(code, true)
            ),
            None => format!("<pre><code>{}</code></pre>\n", escape(code, true)),
        }
    }

    fn blockquote(&self, body: &str) -> String {
        format!("<blockquote>\n{body}</blockquote>\n")
    }

    fn html(&self, html: &str) -> String {
        html.to_string()
    }

    fn heading(&self, text: &str, level: u8, raw: &str) -> String {
        let id = heading_id(&self.options().header_prefix, raw);
        format!("<h{level} id=\"{id}\">{text}</h{level}>\n")
    }

    fn hr(&self) -> String {
        if self.options().xhtml {
            "<hr/>\n".to_string()
        } else {
            "<hr>\n".to_string()
        }
    }

    fn list(&self, body: &str, ordered: bool) -> String {
        let tag = if ordered { "ol" } else { "ul" };
        format!("<{tag}>\n{body}</{tag}>\n")
    }

    fn listitem(&self, text: &str) -> String {
        format!("<li>{text}</li>\n")
    }

    fn paragraph(&self, text: &str) -> String {
        format!("<p>{text}</p>\n")
    }

    fn table(&self, header: &str, body: &str) -> String {
        format!("<table>\n<thead>\n{header}</thead>\n<tbody>\n{body}</tbody>\n</table>\n")
    }

    fn tablerow(&self, content: &str) -> String {
        format!("<tr>\n{content}</tr>\n")
    }

    fn tablecell(&self, content: &str, header: bool, align: Align) -> String {
        let tag = if header { "th" } else { "td" };
        match align.as_css() {
            Some(css) => format!("<{tag} style=\"text-align:{css}\">{content}</{tag}>\n"),
            None => format!("<{tag}>{content}</{tag}>\n"),
        }
    }

    fn strong(&self, text: &str) -> String {
        format!("<strong>{text}</strong>")
    }

    fn em(&self, text: &str) -> String {
        format!("<em>{text}</em>")
    }

    fn codespan(&self, code: &str) -> String {
        format!("<code>{code}</code>")
    }

    fn br(&self) -> String {
        if self.options().xhtml {
            "<br/>".to_string()
        } else {
            "<br>".to_string()
        }
    }

    fn del(&self, text: &str) -> String {
        format!("<del>{text}</del>")
    }

    fn link(&self, href: &str, title: Option<&str>, text: &str) -> String {
        if self.options().sanitize && is_script_href(href) {
            return text.to_string();
        }
        match title {
            Some(title) => format!("<a href=\"{href}\" title=\"{title}\">{text}</a>"),
            None => format!("<a href=\"{href}\">{text}</a>"),
        }
    }

    fn image(&self, href: &str, title: Option<&str>, text: &str) -> String {
        let mut out = format!("<img src=\"{href}\" alt=\"{text}\"");
        if let Some(title) = title {
            out.push_str(&format!(" title=\"{title}\""));
        }
        out.push_str(if self.options().xhtml { "/>" } else { ">" });
        out
    }

    fn text(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Renderer for chat posts.
#[derive(Debug)]
pub struct HtmlRenderer<'a> {
    options: &'a MarkdownOptions,
    formatting: &'a FormattingOptions,
    formatter: &'a dyn TextFormatter,
    highlighter: &'a dyn Highlighter,
    math: &'a dyn MathRenderer,
    origin: Option<String>,
}

impl<'a> HtmlRenderer<'a> {
    /// Creates a renderer with the default collaborators.
    pub fn new(options: &'a MarkdownOptions, formatting: &'a FormattingOptions) -> Self {
        HtmlRenderer {
            options,
            formatting,
            formatter: &PlainTextFormatter,
            highlighter: &NoHighlighter,
            math: &NoMath,
            origin: None,
        }
    }

    pub fn with_formatter(mut self, formatter: &'a dyn TextFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_highlighter(mut self, highlighter: &'a dyn Highlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn with_math(mut self, math: &'a dyn MathRenderer) -> Self {
        self.math = math;
        self
    }

    /// Sets the prefix of same-origin hrefs, which open in the same tab.
    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    fn plain_code(&self, code: &str) -> String {
        format!(
            "<div class=\"post-body--code\"><code class=\"hljs\">{}</code></div>",
            self.formatter.sanitize_html(code)
        )
    }

    fn math_code(&self, code: &str) -> String {
        match self.math.render_math(&self.formatter.sanitize_html(code)) {
            Ok(html) => format!("<div class=\"post-body--code tex\">{html}</div>"),
            Err(err) => {
                warn!("math rendering failed, falling back to plain code: {err}");
                format!(
                    "<div class=\"post-body--code\">{}</div>",
                    self.formatter.sanitize_html(code)
                )
            }
        }
    }

    fn is_same_origin(&self, href: &str) -> bool {
        self.origin
            .as_deref()
            .is_some_and(|origin| href.starts_with(origin))
    }
}

impl Renderer for HtmlRenderer<'_> {
    fn options(&self) -> &MarkdownOptions {
        self.options
    }

    fn code(&self, code: &str, lang: Option<&str>) -> String {
        let Some(lang) = lang.map(str::to_lowercase) else {
            return self.plain_code(code);
        };
        let lang = if lang == "html" { "xml".to_string() } else { lang };

        if lang == "tex" || lang == "latex" {
            return self.math_code(code);
        }
        if !self.highlighter.is_known(&lang) {
            return self.plain_code(code);
        }

        match self.highlighter.highlight(&lang, code) {
            Ok(highlighted) => format!(
                "<div class=\"post-body--code\"><span class=\"post-body--code__language\">{}</span><code class=\"hljs\">{highlighted}</code></div>",
                language_display_name(&lang).unwrap_or(&lang)
            ),
            Err(err) => {
                warn!("highlighting failed, falling back to plain code: {err}");
                self.plain_code(code)
            }
        }
    }

    fn heading(&self, text: &str, level: u8, raw: &str) -> String {
        let id = heading_id(&self.options.header_prefix, raw);
        format!("<h{level} id=\"{id}\" class=\"markdown__heading\">{text}</h{level}>")
    }

    fn link(&self, href: &str, title: Option<&str>, text: &str) -> String {
        if self.options.sanitize && is_script_href(href) {
            return text.to_string();
        }

        let (mut href, text, prefix, suffix) =
            if href.len() > 1 && href.starts_with('(') && href.ends_with(')') && text == href {
                let inner = &href[1..href.len() - 1];
                (inner.to_string(), inner, "(", ")")
            } else {
                (href.to_string(), text, "", "")
            };

        if !SCHEME.is_match(&href) {
            href = format!("http://{href}");
        }

        let mut out = format!("<a class=\"theme markdown__link\" href=\"{href}\"");
        if let Some(title) = title {
            out.push_str(&format!(" title=\"{title}\""));
        }
        if self.is_same_origin(&href) {
            out.push('>');
        } else {
            out.push_str(" target=\"_blank\">");
        }
        format!("{prefix}{out}{text}</a>{suffix}")
    }

    fn image(&self, href: &str, title: Option<&str>, text: &str) -> String {
        let callback = &self.options.image_loaded_callback;
        let mut out = format!("<img src=\"{href}\" alt=\"{text}\"");
        if let Some(title) = title {
            out.push_str(&format!(" title=\"{title}\""));
        }
        out.push_str(&format!(
            " onload=\"{callback}(this)\" onerror=\"{callback}(this)\" class=\"markdown-inline-img\""
        ));
        out.push_str(if self.options.xhtml { "/>" } else { ">" });
        out
    }

    fn table(&self, header: &str, body: &str) -> String {
        format!("<table class=\"markdown__table\"><thead>{header}</thead><tbody>{body}</tbody></table>")
    }

    fn paragraph(&self, text: &str) -> String {
        if self.formatting.singleline {
            format!("<p class=\"markdown__paragraph-inline\">{text}</p>")
        } else {
            format!("<p>{text}</p>\n")
        }
    }

    fn br(&self) -> String {
        if self.formatting.singleline {
            " ".to_string()
        } else if self.options.xhtml {
            "<br/>".to_string()
        } else {
            "<br>".to_string()
        }
    }

    fn text(&self, text: &str) -> String {
        self.formatter.format_text(text, self.formatting)
    }
}
