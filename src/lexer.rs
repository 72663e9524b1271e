//! Block-level lexical analysis.
//!
//! The block lexer splits normalized chat text into a flat sequence of
//! [`Token`]s. Nested constructs (blockquotes, lists) are emitted as start
//! and end markers around the tokens of their body, which the lexer produces
//! by recursing into the stripped body text.
mod list;
mod position;
mod rules;
mod table;
mod token;

pub use position::Position;
pub use token::{link_key, Align, LinkDef, LinkTable, Token, Tokens};

use crate::config::MarkdownOptions;
use crate::error::{MarkdownError, Result};
use tracing::{debug, error, trace};

/// Tags whose HTML blocks keep their content verbatim.
const PRE_TAGS: &[&str] = &["pre", "script", "style"];

/// Normalizes line endings, tabs and special spaces before lexing.
pub fn normalize(src: &str) -> String {
    src.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "    ")
        .replace('\u{a0}', " ")
        .replace('\u{2424}', "\n")
}

/// Blanks lines that hold nothing but spaces.
fn blank_space_lines(src: &str) -> String {
    src.split('\n')
        .map(|line| if line.bytes().all(|b| b == b' ') { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes `prefix`-style markers from the start of every line.
fn strip_lines(text: &str, strip: impl Fn(&str) -> &str) -> String {
    text.split('\n').map(strip).collect::<Vec<_>>().join("\n")
}

/// The block lexer.
pub struct BlockLexer<'a> {
    options: &'a MarkdownOptions,
    links: LinkTable,
}

impl<'a> BlockLexer<'a> {
    /// Creates a new lexer bound to `options`.
    pub fn new(options: &'a MarkdownOptions) -> Self {
        BlockLexer {
            options,
            links: LinkTable::new(),
        }
    }

    /// Lexes `src` into its token sequence and link table.
    pub fn lex(mut self, src: &str) -> Result<Tokens> {
        let src = normalize(src);
        let mut tokens = Vec::new();
        self.tokenize(&src, true, false, &mut tokens)?;

        debug!(
            input_len = src.len(),
            tokens = tokens.len(),
            links = self.links.len(),
            "lexed block tokens"
        );

        Ok(Tokens {
            tokens,
            links: self.links,
        })
    }

    /// Lexes `src` into `tokens`.
    ///
    /// `top` is false inside list items, where paragraphs, tables and link
    /// definitions are not recognized. `bq` is true inside blockquotes,
    /// where link definitions are not recognized either.
    fn tokenize(&mut self, src: &str, top: bool, bq: bool, tokens: &mut Vec<Token>) -> Result<()> {
        let mut src = blank_space_lines(src);
        let mut pos = 0;
        let tables = self.options.gfm && self.options.tables;

        while pos < src.len() {
            let rest = &src[pos..];

            if let Some(run) = rules::newline(rest) {
                trace!(rule = "newline", len = run);
                if run > 1 {
                    tokens.push(Token::Space);
                }
                pos += run;
                continue;
            }

            if let Some(len) = rules::indented_code(rest) {
                trace!(rule = "code", len);
                let code = strip_lines(&rest[..len], |line| {
                    line.strip_prefix("    ").unwrap_or(line)
                });
                let text = if self.options.pedantic {
                    code
                } else {
                    code.trim_end_matches('\n').to_string()
                };
                tokens.push(Token::Code { lang: None, text });
                pos += len;
                continue;
            }

            if self.options.gfm {
                if let Some((len, fence)) = rules::fences(rest) {
                    trace!(rule = "fences", len);
                    tokens.push(Token::Code {
                        lang: fence.lang.map(str::to_string),
                        text: fence.text.to_string(),
                    });
                    pos += len;
                    continue;
                }
            }

            if let Some((len, (depth, text))) = rules::heading(rest) {
                trace!(rule = "heading", len);
                tokens.push(Token::Heading {
                    depth,
                    text: text.to_string(),
                });
                pos += len;
                continue;
            }

            if top && tables {
                if let Some((len, capture)) = rules::nptable(rest) {
                    trace!(rule = "nptable", len);
                    tokens.push(table::build(&capture, false));
                    pos += len;
                    continue;
                }
            }

            if let Some((len, (depth, text))) = rules::lheading(rest) {
                trace!(rule = "lheading", len);
                tokens.push(Token::LHeading {
                    depth,
                    text: text.to_string(),
                });
                pos += len;
                continue;
            }

            if let Some(len) = rules::hr(rest) {
                trace!(rule = "hr", len);
                tokens.push(Token::Hr);
                pos += len;
                continue;
            }

            if let Some(len) = rules::blockquote(rest) {
                trace!(rule = "blockquote", len);
                let body = strip_lines(&rest[..len], |line| {
                    match line.trim_start_matches(' ').strip_prefix('>') {
                        Some(quoted) => quoted.strip_prefix(' ').unwrap_or(quoted),
                        None => line,
                    }
                });
                tokens.push(Token::BlockquoteStart);
                self.tokenize(&body, top, true, tokens)?;
                tokens.push(Token::BlockquoteEnd);
                pos += len;
                continue;
            }

            if let Some((len, capture)) = rules::list(rest) {
                let items = rules::list_items(capture.block);
                if items.len() > 1 {
                    trace!(rule = "list", len, items = items.len());
                    let remainder = self.list(capture.bullet, &items, bq, tokens)?;
                    let after = pos + len;
                    match remainder {
                        Some(remainder) => {
                            src = remainder + &src[after..];
                            pos = 0;
                        }
                        None => pos = after,
                    }
                    continue;
                }
            }

            if let Some((len, capture)) = rules::html(rest) {
                trace!(rule = "html", len);
                let text = capture.text.to_string();
                if self.options.sanitize {
                    tokens.push(Token::Paragraph { text });
                } else {
                    let pre = capture.tag.is_some_and(|tag| PRE_TAGS.contains(&tag));
                    tokens.push(Token::Html { pre, text });
                }
                pos += len;
                continue;
            }

            if top && !bq {
                if let Some((len, definition)) = rules::def(rest) {
                    trace!(rule = "def", len, label = definition.label);
                    self.links.insert(
                        link_key(definition.label),
                        LinkDef {
                            href: definition.href.to_string(),
                            title: definition.title.map(str::to_string),
                        },
                    );
                    pos += len;
                    continue;
                }
            }

            if top && tables {
                if let Some((len, capture)) = rules::table(rest) {
                    trace!(rule = "table", len);
                    tokens.push(table::build(&capture, true));
                    pos += len;
                    continue;
                }
            }

            if top {
                if let Some((len, text)) = rules::paragraph(rest) {
                    trace!(rule = "paragraph", len);
                    tokens.push(Token::Paragraph {
                        text: text.to_string(),
                    });
                    pos += len;
                    continue;
                }
            }

            if let Some(len) = rules::text(rest) {
                trace!(rule = "text", len);
                tokens.push(Token::Text {
                    text: rest[..len].to_string(),
                });
                pos += len;
                continue;
            }

            let code = rest.chars().next().map_or(0, u32::from);
            let position = Position::locate(&src, pos);
            error!(
                line = position.line,
                column = position.column,
                "no block rule matched"
            );
            return Err(MarkdownError::lex_error(
                position,
                format!("Infinite loop on byte: {code}"),
            ));
        }

        Ok(())
    }
}
