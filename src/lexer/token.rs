use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Block-level token produced by the block lexer.
///
/// Lists and blockquotes are not nested values: their content sits between
/// a start and an end marker in the flat token sequence, and the parser
/// rebuilds the nesting while consuming the sequence in order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Token {
    /// A run of two or more newlines.
    Space,
    /// Indented or fenced code block.
    Code { lang: Option<String>, text: String },
    /// ATX heading `## Title`.
    Heading { depth: u8, text: String },
    /// Setext heading, a line underlined with `=` or `-`.
    LHeading { depth: u8, text: String },
    /// GFM table with per-column alignment.
    Table {
        header: Vec<String>,
        align: Vec<Align>,
        cells: Vec<Vec<String>>,
    },
    Hr,
    BlockquoteStart,
    BlockquoteEnd,
    ListStart { ordered: bool },
    ListItemStart,
    /// Item rendered with paragraph spacing.
    LooseItemStart,
    ListItemEnd,
    ListEnd,
    /// Raw HTML block; only produced when sanitizing is off.
    Html { pre: bool, text: String },
    Paragraph { text: String },
    /// Inline text run inside a list item or blockquote.
    Text { text: String },
}

/// Column alignment of a table, read from its divider row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Align {
    Left,
    Center,
    Right,
    /// No colon in the divider cell; the column inherits its alignment.
    None,
}

impl Align {
    /// Classifies a divider cell such as `:--`, `:-:` or `--:`.
    pub fn from_divider(cell: &str) -> Self {
        let cell = cell.trim_matches(' ');
        let leading = cell.starts_with(':');
        let trailing = cell.ends_with(':') && cell.len() > 1;
        let dashes = cell.trim_start_matches(':').trim_end_matches(':').trim_matches(' ');

        if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
            return Align::None;
        }

        match (leading, trailing) {
            (false, true) => Align::Right,
            (true, true) => Align::Center,
            (true, false) => Align::Left,
            (false, false) => Align::None,
        }
    }

    /// CSS `text-align` value, if the column has one.
    pub fn as_css(self) -> Option<&'static str> {
        match self {
            Align::Left => Some("left"),
            Align::Center => Some("center"),
            Align::Right => Some("right"),
            Align::None => None,
        }
    }
}

/// Target of a reference-style link definition `[label]: href "title"`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkDef {
    pub href: String,
    pub title: Option<String>,
}

/// Link definitions keyed by lowercased label.
pub type LinkTable = HashMap<String, LinkDef>;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Key a reference label is stored and looked up under: whitespace runs
/// collapse to one space and case is folded. Edges are not trimmed.
pub fn link_key(label: &str) -> String {
    WHITESPACE_RUN.replace_all(label, " ").to_lowercase()
}

/// Output of the block lexer: the token sequence plus its link table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tokens {
    pub tokens: Vec<Token>,
    pub links: LinkTable,
}

impl Tokens {
    /// Looks up a link definition by label, ignoring case.
    pub fn link(&self, label: &str) -> Option<&LinkDef> {
        self.links.get(&link_key(label))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_divider_cells() {
        assert_eq!(Align::from_divider("---"), Align::None);
        assert_eq!(Align::from_divider(" --: "), Align::Right);
        assert_eq!(Align::from_divider(":-:"), Align::Center);
        assert_eq!(Align::from_divider(":--"), Align::Left);
        assert_eq!(Align::from_divider(":"), Align::None);
    }

    #[test]
    fn link_lookup_ignores_case() {
        let mut tokens = Tokens::default();
        tokens.links.insert(
            "docs".to_string(),
            LinkDef {
                href: "https://example.com".to_string(),
                title: None,
            },
        );
        assert!(tokens.link("DOCS").is_some());
        assert!(tokens.link("other").is_none());
    }

    #[test]
    fn link_keys_collapse_whitespace_but_keep_edges() {
        assert_eq!(link_key("The\n  Docs"), "the docs");
        assert_eq!(link_key(" docs "), " docs ");
        assert_eq!(link_key("\tdocs"), " docs");
    }
}
