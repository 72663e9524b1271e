use super::inline_rules as rules;
use crate::codegen::{escape, Renderer};
use crate::error::{MarkdownError, Result};
use crate::lexer::{link_key, LinkTable, Position};
use tracing::{error, trace};

/// Renders the inline content of a single block token.
///
/// The lexer is bound to the link table of the token sequence it renders.
/// It tracks whether it is inside link text, where bare URLs are not
/// linked again.
pub struct InlineLexer<'a> {
    links: &'a LinkTable,
    renderer: &'a dyn Renderer,
    in_link: bool,
}

impl<'a> InlineLexer<'a> {
    pub fn new(links: &'a LinkTable, renderer: &'a dyn Renderer) -> Self {
        InlineLexer {
            links,
            renderer,
            in_link: false,
        }
    }

    /// Renders `src` to HTML.
    pub fn output(&mut self, src: &str) -> Result<String> {
        let options = self.renderer.options();
        let sanitize = options.sanitize;
        let gfm = options.gfm;
        let links = self.links;

        let mut out = String::new();
        let mut pos = 0;

        while pos < src.len() {
            let rest = &src[pos..];

            if let Some((len, c)) = rules::escape(rest) {
                trace!(rule = "escape", len);
                out.push_str(&escape(c.encode_utf8(&mut [0; 4]), true));
                pos += len;
                continue;
            }

            if let Some((len, autolink)) = rules::autolink(rest) {
                trace!(rule = "autolink", len, email = autolink.email);
                let (href, text) = if autolink.email {
                    let address = autolink.text.strip_prefix("mailto:").unwrap_or(autolink.text);
                    let text = escape(address, false);
                    (format!("mailto:{text}"), text)
                } else {
                    let text = escape(autolink.text, false);
                    (text.clone(), text)
                };
                out.push_str(&self.renderer.link(&href, None, &text));
                pos += len;
                continue;
            }

            if gfm && !self.in_link {
                if let Some(len) = rules::url(rest) {
                    trace!(rule = "url", len);
                    let text = escape(&rest[..len], false);
                    out.push_str(&self.renderer.link(&text, None, &text));
                    pos += len;
                    continue;
                }
            }

            if let Some(len) = rules::tag(rest) {
                trace!(rule = "tag", len);
                let tag = &rest[..len];
                let lower = tag.to_ascii_lowercase();
                if !self.in_link && lower.starts_with("<a ") {
                    self.in_link = true;
                } else if self.in_link && lower.starts_with("</a>") {
                    self.in_link = false;
                }
                if sanitize {
                    out.push_str(&escape(tag, false));
                } else {
                    out.push_str(tag);
                }
                pos += len;
                continue;
            }

            if let Some((len, link)) = rules::link(rest) {
                trace!(rule = "link", len, image = link.image);
                self.in_link = true;
                let rendered = self.output_link(link.image, link.text, link.href, link.title);
                self.in_link = false;
                out.push_str(&rendered?);
                pos += len;
                continue;
            }

            if let Some((len, reference)) = rules::reflink(rest).or_else(|| rules::nolink(rest)) {
                let label = link_key(reference.label);
                match links.get(&label).filter(|def| !def.href.is_empty()) {
                    Some(def) => {
                        trace!(rule = "reflink", len, label = label.as_str());
                        self.in_link = true;
                        let rendered = self.output_link(
                            reference.image,
                            reference.text,
                            &def.href,
                            def.title.as_deref(),
                        );
                        self.in_link = false;
                        out.push_str(&rendered?);
                        pos += len;
                    }
                    None => {
                        trace!(rule = "reflink", label = label.as_str(), "unresolved reference");
                        out.push_str(&rest[..1]);
                        pos += 1;
                    }
                }
                continue;
            }

            if let Some((len, text)) = rules::strong(rest) {
                trace!(rule = "strong", len);
                let inner = self.output(text)?;
                out.push_str(&self.renderer.strong(&inner));
                pos += len;
                continue;
            }

            if let Some((len, text)) = rules::em(rest) {
                trace!(rule = "em", len);
                let inner = self.output(text)?;
                out.push_str(&self.renderer.em(&inner));
                pos += len;
                continue;
            }

            if let Some((len, code)) = rules::code(rest) {
                trace!(rule = "code", len);
                out.push_str(&self.renderer.codespan(&escape(code, true)));
                pos += len;
                continue;
            }

            if let Some(len) = rules::br(rest) {
                trace!(rule = "br", len);
                out.push_str(&self.renderer.br());
                pos += len;
                continue;
            }

            if gfm {
                if let Some((len, text)) = rules::del(rest) {
                    trace!(rule = "del", len);
                    let inner = self.output(text)?;
                    out.push_str(&self.renderer.del(&inner));
                    pos += len;
                    continue;
                }
            }

            if let Some(len) = rules::text(rest) {
                trace!(rule = "text", len);
                out.push_str(&self.renderer.text(&escape(&rest[..len], false)));
                pos += len;
                continue;
            }

            let code = rest.chars().next().map_or(0, u32::from);
            let position = Position::locate(src, pos);
            error!(
                line = position.line,
                column = position.column,
                "no inline rule matched"
            );
            return Err(MarkdownError::inline_error(
                position,
                format!("Infinite loop on byte: {code}"),
            ));
        }

        Ok(out)
    }

    fn output_link(
        &mut self,
        image: bool,
        text: &str,
        href: &str,
        title: Option<&str>,
    ) -> Result<String> {
        let href = escape(href, false);
        let title = title.map(|title| escape(title, false));
        if image {
            Ok(self
                .renderer
                .image(&href, title.as_deref(), &escape(text, false)))
        } else {
            let text = self.output(text)?;
            Ok(self.renderer.link(&href, title.as_deref(), &text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::HtmlRenderer;
    use crate::config::{FormattingOptions, MarkdownOptions};
    use crate::lexer::LinkDef;
    use pretty_assertions::assert_eq;

    fn render(src: &str) -> String {
        render_with_links(src, &LinkTable::new())
    }

    fn render_with_links(src: &str, links: &LinkTable) -> String {
        let options = MarkdownOptions::default();
        let formatting = FormattingOptions::default();
        let renderer = HtmlRenderer::new(&options, &formatting);
        InlineLexer::new(links, &renderer).output(src).unwrap()
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(render("**bold** and _em_"), "<strong>bold</strong> and <em>em</em>");
        assert_eq!(render("~~gone~~"), "<del>gone</del>");
    }

    #[test]
    fn test_snake_case_is_literal() {
        assert_eq!(render("word_with_underscore_here"), "word_with_underscore_here");
    }

    #[test]
    fn test_code_span_is_escaped() {
        assert_eq!(render("`<b>&amp;`"), "<code>&lt;b&gt;&amp;amp;</code>");
    }

    #[test]
    fn test_escapes_are_literal() {
        assert_eq!(render("\\*not em\\*"), "*not em*");
        assert_eq!(render("\\<b\\>"), "&lt;b&gt;");
    }

    #[test]
    fn test_tags_are_escaped() {
        assert_eq!(
            render("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_bare_url() {
        assert_eq!(
            render("see www.example.com."),
            "see <a class=\"theme markdown__link\" href=\"http://www.example.com\" target=\"_blank\">www.example.com</a>."
        );
    }

    #[test]
    fn test_parenthesized_url() {
        assert_eq!(
            render("(see https://example.com/x)"),
            "(see <a class=\"theme markdown__link\" href=\"https://example.com/x\" target=\"_blank\">https://example.com/x</a>)"
        );
        assert_eq!(
            render("(https://example.com/a_(b))"),
            "(<a class=\"theme markdown__link\" href=\"https://example.com/a_(b)\" target=\"_blank\">https://example.com/a_(b)</a>)"
        );
    }

    #[test]
    fn test_email_autolink() {
        assert_eq!(
            render("<mailto:user@example.com>"),
            "<a class=\"theme markdown__link\" href=\"mailto:user@example.com\" target=\"_blank\">user@example.com</a>"
        );
    }

    #[test]
    fn test_inline_link_text_is_not_relinked() {
        assert_eq!(
            render("[https://a.com](https://b.com)"),
            "<a class=\"theme markdown__link\" href=\"https://b.com\" target=\"_blank\">https://a.com</a>"
        );
    }

    #[test]
    fn test_reference_links() {
        let mut links = LinkTable::new();
        links.insert(
            "docs".to_string(),
            LinkDef {
                href: "https://docs.example.com".to_string(),
                title: None,
            },
        );
        assert_eq!(
            render_with_links("read [the  Docs] or [the guide][DOCS]", &links),
            "read [the  Docs] or <a class=\"theme markdown__link\" href=\"https://docs.example.com\" target=\"_blank\">the guide</a>"
        );
        assert_eq!(
            render_with_links("[docs]", &links),
            "<a class=\"theme markdown__link\" href=\"https://docs.example.com\" target=\"_blank\">docs</a>"
        );
    }

    #[test]
    fn test_collapsed_reference_link() {
        let mut links = LinkTable::new();
        links.insert(
            "docs".to_string(),
            LinkDef {
                href: "https://docs.example.com".to_string(),
                title: None,
            },
        );
        assert_eq!(
            render_with_links("see [Docs][] now", &links),
            "see <a class=\"theme markdown__link\" href=\"https://docs.example.com\" target=\"_blank\">Docs</a> now"
        );
    }

    #[test]
    fn test_reference_labels_keep_edge_spaces() {
        let mut links = LinkTable::new();
        links.insert(
            link_key(" Docs "),
            LinkDef {
                href: "https://docs.example.com".to_string(),
                title: None,
            },
        );
        assert_eq!(
            render_with_links("see [ docs ] now", &links),
            "see <a class=\"theme markdown__link\" href=\"https://docs.example.com\" target=\"_blank\"> docs </a> now"
        );
        assert_eq!(render_with_links("[docs]", &links), "[docs]");
    }

    #[test]
    fn test_escaped_brackets_in_link_text() {
        assert_eq!(
            render("[a\\[b](c)"),
            "<a class=\"theme markdown__link\" href=\"http://c\" target=\"_blank\">a[b</a>"
        );
    }

    #[test]
    fn test_unresolved_reference_is_literal() {
        assert_eq!(render("[missing]"), "[missing]");
    }

    #[test]
    fn test_image() {
        assert_eq!(
            render("![a \"cat\"](cat.png)"),
            "<img src=\"cat.png\" alt=\"a &quot;cat&quot;\" onload=\"markdownImageLoaded(this)\" onerror=\"markdownImageLoaded(this)\" class=\"markdown-inline-img\">"
        );
    }

    #[test]
    fn test_line_break() {
        assert_eq!(render("one  \ntwo"), "one<br>two");
    }
}
