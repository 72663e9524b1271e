use super::rules::{find_bullet, leading_spaces, strip_bullet};
use super::{BlockLexer, Token};
use crate::error::Result;
use tracing::trace;

/// Removes up to `width` leading spaces from every line.
fn outdent(text: &str, width: usize) -> String {
    text.split('\n')
        .map(|line| &line[leading_spaces(line).min(width)..])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips the bullet from an item and outdents its continuation lines.
fn item_body(item: &str, pedantic: bool) -> String {
    let body = strip_bullet(item);
    if !body.contains("\n ") {
        return body.to_string();
    }
    let width = if pedantic { 4 } else { item.len() - body.len() };
    outdent(body, width)
}

/// Whether the item holds a blank line followed by more content.
fn has_inner_gap(item: &str) -> bool {
    item.find("\n\n")
        .is_some_and(|idx| !item[idx + 2..].chars().all(char::is_whitespace))
}

/// Whether a sibling bullet can continue a list started with `bullet`.
///
/// Ordered markers are interchangeable; bullet characters must match.
fn compatible(bullet: &str, next: &str) -> bool {
    bullet == next || (bullet.len() > 1 && next.len() > 1)
}

impl BlockLexer<'_> {
    /// Emits the tokens of a list whose top-level items are `items`.
    ///
    /// With smart lists on, the list ends at the first item whose bullet
    /// does not fit the list. The unconsumed items are returned so the
    /// caller can lex them again as a new block.
    pub(super) fn list(
        &mut self,
        bullet: &str,
        items: &[&str],
        bq: bool,
        tokens: &mut Vec<Token>,
    ) -> Result<Option<String>> {
        tokens.push(Token::ListStart {
            ordered: bullet.len() > 1,
        });

        let mut remainder = None;
        let mut next = false;
        let mut last = items.len() - 1;
        let mut i = 0;

        while i <= last {
            let item = items[i];
            let body = item_body(item, self.options.pedantic);

            if self.options.smart_lists && i != last {
                let following = find_bullet(items[i + 1]).unwrap_or_default();
                if !compatible(bullet, following) {
                    trace!(bullet, following, "list ends at incompatible bullet");
                    remainder = Some(items[i + 1..].join("\n"));
                    last = i;
                }
            }

            let mut loose = next || has_inner_gap(&body);
            if i != last {
                next = body.ends_with('\n');
                loose |= next;
            }

            tokens.push(if loose {
                Token::LooseItemStart
            } else {
                Token::ListItemStart
            });
            self.tokenize(&body, false, bq, tokens)?;
            tokens.push(Token::ListItemEnd);
            i += 1;
        }

        tokens.push(Token::ListEnd);
        Ok(remainder)
    }
}
