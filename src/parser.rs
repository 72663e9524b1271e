// Block parser: walks the token sequence and renders it through a Renderer.
mod inline;
mod inline_rules;

#[cfg(test)]
mod tests;

pub use inline::InlineLexer;

use crate::codegen::Renderer;
use crate::error::Result;
use crate::lexer::{Align, Token, Tokens};
use tracing::debug;

/// Renders a lexed token sequence to HTML.
///
/// Bracketed constructs (lists, list items, blockquotes) are rebuilt by
/// consuming tokens up to their end marker, recursing for nested content.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    inline: InlineLexer<'a>,
    renderer: &'a dyn Renderer,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a Tokens, renderer: &'a dyn Renderer) -> Self {
        Parser {
            tokens: &tokens.tokens,
            pos: 0,
            inline: InlineLexer::new(&tokens.links, renderer),
            renderer,
        }
    }

    /// Renders every token in order.
    pub fn parse(mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(token) = self.next() {
            out.push_str(&self.tok(token)?);
        }
        debug!(
            tokens = self.tokens.len(),
            output_len = out.len(),
            "rendered token sequence"
        );
        Ok(out)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// Joins a run of adjacent text tokens with newlines and renders it
    /// inline.
    fn parse_text(&mut self, first: &str) -> Result<String> {
        let mut body = first.to_string();
        while let Some(Token::Text { text }) = self.peek() {
            body.push('\n');
            body.push_str(text);
            self.pos += 1;
        }
        self.inline.output(&body)
    }

    /// Renders tokens until `end` (consumed) or the end of the sequence.
    fn body_until(&mut self, end: &Token, text_inline: bool) -> Result<String> {
        let mut body = String::new();
        while let Some(token) = self.next() {
            if token == end {
                break;
            }
            match token {
                Token::Text { text } if text_inline => body.push_str(&self.parse_text(text)?),
                token => body.push_str(&self.tok(token)?),
            }
        }
        Ok(body)
    }

    fn table(&mut self, header: &[String], align: &[Align], cells: &[Vec<String>]) -> Result<String> {
        let column = |idx: usize| align.get(idx).copied().unwrap_or(Align::None);

        let mut head = String::new();
        for (idx, cell) in header.iter().enumerate() {
            let content = self.inline.output(cell)?;
            head.push_str(&self.renderer.tablecell(&content, true, column(idx)));
        }
        let head = self.renderer.tablerow(&head);

        let mut body = String::new();
        for row in cells {
            let mut cols = String::new();
            for (idx, cell) in row.iter().enumerate() {
                let content = self.inline.output(cell)?;
                cols.push_str(&self.renderer.tablecell(&content, false, column(idx)));
            }
            body.push_str(&self.renderer.tablerow(&cols));
        }

        Ok(self.renderer.table(&head, &body))
    }

    fn tok(&mut self, token: &'a Token) -> Result<String> {
        let renderer = self.renderer;
        let html = match token {
            Token::Space => String::new(),
            Token::Hr => renderer.hr(),
            Token::Heading { depth, text } | Token::LHeading { depth, text } => {
                let inline = self.inline.output(text)?;
                renderer.heading(&inline, *depth, text)
            }
            Token::Code { lang, text } => renderer.code(text, lang.as_deref()),
            Token::Table {
                header,
                align,
                cells,
            } => self.table(header, align, cells)?,
            Token::BlockquoteStart => {
                let body = self.body_until(&Token::BlockquoteEnd, false)?;
                renderer.blockquote(&body)
            }
            Token::ListStart { ordered } => {
                let body = self.body_until(&Token::ListEnd, false)?;
                renderer.list(&body, *ordered)
            }
            Token::ListItemStart => {
                let body = self.body_until(&Token::ListItemEnd, true)?;
                renderer.listitem(&body)
            }
            Token::LooseItemStart => {
                let body = self.body_until(&Token::ListItemEnd, false)?;
                renderer.listitem(&body)
            }
            Token::Html { pre, text } => {
                if !pre && !renderer.options().pedantic {
                    let inline = self.inline.output(text)?;
                    renderer.html(&inline)
                } else {
                    renderer.html(text)
                }
            }
            Token::Paragraph { text } => {
                let inline = self.inline.output(text)?;
                renderer.paragraph(&inline)
            }
            Token::Text { text } => {
                let inline = self.parse_text(text)?;
                renderer.paragraph(&inline)
            }
            Token::BlockquoteEnd | Token::ListItemEnd | Token::ListEnd => String::new(),
        };
        Ok(html)
    }
}
