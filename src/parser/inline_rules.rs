use lazy_static::lazy_static;
use nom::bytes::complete::take_while_m_n;
use nom::character::complete::{char, one_of};
use nom::sequence::preceded;
use nom::IResult;
use regex::Regex;

lazy_static! {
    static ref URL: Regex =
        Regex::new(r#"^\(?(?:https?://|www\.)[^\s<.][^\s<]*[^<.,:;"'\]\s]"#).unwrap();
    static ref TAG: Regex = Regex::new(
        r#"^(?:<!--[\s\S]*?-->|</?[A-Za-z0-9_]+(?:"[^"]*"|'[^']*'|[^'">])*?>)"#
    )
    .unwrap();
}

/// Characters that `\` turns into literals.
const ESCAPABLE: &str = "\\`*{}[]()#+-.!_>~|";

/// Characters that end a plain text run.
const TEXT_STOPS: &[char] = &['\\', '<', '!', '[', '*', '`', '~'];

/// An autolink in angle brackets.
#[derive(Debug, PartialEq)]
pub(super) struct Autolink<'a> {
    pub text: &'a str,
    pub email: bool,
}

/// An inline link or image `[text](href "title")`.
#[derive(Debug, PartialEq)]
pub(super) struct LinkCapture<'a> {
    pub image: bool,
    pub text: &'a str,
    pub href: &'a str,
    pub title: Option<&'a str>,
}

/// A reference link or image `[text][label]` or `[label]`.
#[derive(Debug, PartialEq)]
pub(super) struct RefCapture<'a> {
    pub image: bool,
    pub text: &'a str,
    pub label: &'a str,
}

pub(super) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn char_at(s: &str, at: usize) -> Option<char> {
    s.get(at..)?.chars().next()
}

fn leading_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn escaped_char(input: &str) -> IResult<&str, char> {
    preceded(char('\\'), one_of(ESCAPABLE))(input)
}

/// Backslash escape, returning the escaped character.
pub(super) fn escape(s: &str) -> Option<(usize, char)> {
    let (rest, c) = escaped_char(s).ok()?;
    Some((s.len() - rest.len(), c))
}

/// `<scheme://...>`, `<www....>` or `<user@host>`.
pub(super) fn autolink(s: &str) -> Option<(usize, Autolink<'_>)> {
    let body = s.strip_prefix('<')?;
    let end = body.find([' ', '>'])?;
    if !body[end..].starts_with('>') || end == 0 {
        return None;
    }
    let text = &body[..end];

    let separator = text
        .char_indices()
        .rev()
        .filter(|(idx, _)| *idx >= 1)
        .find_map(|(idx, c)| {
            if c == '@' && idx + 1 < text.len() {
                Some(true)
            } else if text[idx..].starts_with(":/") && idx + 2 < text.len() {
                Some(false)
            } else {
                None
            }
        });

    let email = match separator {
        Some(email) => email,
        None if text.starts_with("www.") && text.len() > 4 => false,
        None => return None,
    };
    Some((end + 2, Autolink { text, email }))
}

/// Bare URL starting with `http://`, `https://` or `www.`, optionally
/// wrapped in parentheses. A trailing `)` without a matching `(` inside the
/// URL is left out of the match.
pub(super) fn url(s: &str) -> Option<usize> {
    let mut url = URL.find(s)?.as_str();
    while url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
        url = url[..url.len() - 1].trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '<' | '.' | ',' | ':' | ';' | '"' | '\'' | ']')
        });
        if URL.find(url).map(|m| m.end()) != Some(url.len()) {
            return None;
        }
    }
    Some(url.len())
}

/// Raw HTML tag or comment.
pub(super) fn tag(s: &str) -> Option<usize> {
    TAG.find(s).map(|m| m.end())
}

/// End offsets of every prefix of link text starting at `start`.
///
/// Link text may hold balanced `[...]` groups and escaped brackets. With
/// `lookahead`, a stray `]` is also allowed when another `]` follows before
/// any `[`.
fn link_text_ends(s: &str, start: usize, lookahead: bool) -> Vec<usize> {
    let mut ends = vec![start];
    let mut pos = start;
    while let Some(c) = char_at(s, pos) {
        match c {
            '\\' if s[pos + 1..].starts_with(['[', ']']) => pos += 2,
            '[' => match s[pos + 1..].find(']') {
                Some(close) => pos += close + 2,
                None => break,
            },
            ']' if lookahead => {
                let rest = &s[pos + 1..];
                match rest.find(['[', ']']) {
                    Some(idx) if rest.as_bytes()[idx] == b']' => pos += 1,
                    _ => break,
                }
            }
            ']' => break,
            c => pos += c.len_utf8(),
        }
        ends.push(pos);
    }
    ends
}

fn closing_paren(s: &str) -> Option<usize> {
    let ws = leading_whitespace(s);
    s[ws..].starts_with(')').then_some(ws + 1)
}

fn link_title(s: &str) -> Option<(usize, &str)> {
    let ws = leading_whitespace(s);
    if ws == 0 || !s[ws..].starts_with(['"', '\'']) {
        return None;
    }
    let body = &s[ws + 1..];
    body.char_indices()
        .filter(|(_, c)| *c == '"' || *c == '\'')
        .find_map(|(idx, _)| {
            let after = ws + 1 + idx + 1;
            closing_paren(&s[after..]).map(|len| (after + len, &body[..idx]))
        })
}

/// Destination and optional title after `](`, through the closing `)`.
fn link_target(s: &str) -> Option<(usize, &str, Option<&str>)> {
    let ws = leading_whitespace(s);
    let angles: &[bool] = if s[ws..].starts_with('<') {
        &[true, false]
    } else {
        &[false]
    };

    for &angle in angles {
        let from = ws + usize::from(angle);
        for href_end in (from..=s.len()).filter(|idx| s.is_char_boundary(*idx)) {
            let href = &s[from..href_end];
            for close_angle in [true, false] {
                if close_angle && !s[href_end..].starts_with('>') {
                    continue;
                }
                let after = href_end + usize::from(close_angle);
                if let Some((len, title)) = link_title(&s[after..]) {
                    return Some((after + len, href, Some(title)));
                }
                if let Some(len) = closing_paren(&s[after..]) {
                    return Some((after + len, href, None));
                }
            }
        }
    }
    None
}

fn link_open(s: &str) -> Option<(bool, usize)> {
    let image = s.starts_with('!');
    let open = usize::from(image);
    s[open..].starts_with('[').then_some((image, open + 1))
}

/// Inline link or image.
pub(super) fn link(s: &str) -> Option<(usize, LinkCapture<'_>)> {
    let (image, start) = link_open(s)?;
    for end in link_text_ends(s, start, true).into_iter().rev() {
        if !s[end..].starts_with("](") {
            continue;
        }
        if let Some((len, href, title)) = link_target(&s[end + 2..]) {
            let capture = LinkCapture {
                image,
                text: &s[start..end],
                href,
                title,
            };
            return Some((end + 2 + len, capture));
        }
    }
    None
}

/// Reference link `[text][label]`, with optional whitespace between. An
/// empty label refers to the text itself.
pub(super) fn reflink(s: &str) -> Option<(usize, RefCapture<'_>)> {
    let (image, start) = link_open(s)?;
    for end in link_text_ends(s, start, true).into_iter().rev() {
        let Some(rest) = s[end..].strip_prefix(']') else {
            continue;
        };
        let ws = leading_whitespace(rest);
        let Some(label_start) = rest[ws..].strip_prefix('[') else {
            continue;
        };
        let Some(label_len) = label_start.find(']') else {
            continue;
        };
        let text = &s[start..end];
        let label = match &label_start[..label_len] {
            "" => text,
            label => label,
        };
        let capture = RefCapture { image, text, label };
        return Some((end + 1 + ws + 1 + label_len + 1, capture));
    }
    None
}

/// Shortcut reference `[label]`.
pub(super) fn nolink(s: &str) -> Option<(usize, RefCapture<'_>)> {
    let (image, start) = link_open(s)?;
    let end = *link_text_ends(s, start, false).last()?;
    if !s[end..].starts_with(']') {
        return None;
    }
    let text = &s[start..end];
    Some((
        end + 1,
        RefCapture {
            image,
            text,
            label: text,
        },
    ))
}

/// `__strong__` or `**strong**`.
pub(super) fn strong(s: &str) -> Option<(usize, &str)> {
    let marker = ["__", "**"].into_iter().find(|m| s.starts_with(m))?;
    let repeat = &marker[..1];
    let body = &s[2..];
    body.char_indices()
        .skip(1)
        .find(|(idx, _)| body[*idx..].starts_with(marker) && !body[idx + 2..].starts_with(repeat))
        .map(|(idx, _)| (idx + 4, &body[..idx]))
}

/// `_em_`: the closing `_` must not touch a word character, and inner
/// underscores only come in pairs.
fn underscore_em(s: &str) -> Option<(usize, &str)> {
    let mut pos = 1;
    let mut units = 0;
    while let Some(c) = char_at(s, pos) {
        if units > 0 && c == '_' && !char_at(s, pos + 1).is_some_and(is_word_char) {
            return Some((pos + 1, &s[1..pos]));
        }
        if c == '_' {
            if !s[pos + 1..].starts_with('_') {
                return None;
            }
            pos += 2;
        } else {
            pos += c.len_utf8();
        }
        units += 1;
    }
    None
}

/// `*em*`: the closing `*` must not be followed by another `*`. Inner
/// `**` pairs are tried as one unit before single characters.
fn star_em(s: &str) -> Option<(usize, &str)> {
    let closes = |pos: usize| s[pos..].starts_with('*') && !s[pos + 1..].starts_with('*');
    let mut visited = vec![false; s.len() + 1];
    let mut stack = Vec::new();

    let push_units = |pos: usize, stack: &mut Vec<usize>| {
        if let Some(c) = char_at(s, pos) {
            stack.push(pos + c.len_utf8());
            if s[pos..].starts_with("**") {
                stack.push(pos + 2);
            }
        }
    };

    push_units(1, &mut stack);
    while let Some(pos) = stack.pop() {
        if visited[pos] {
            continue;
        }
        visited[pos] = true;
        if closes(pos) {
            return Some((pos + 1, &s[1..pos]));
        }
        push_units(pos, &mut stack);
    }
    None
}

/// `_em_` or `*em*`.
pub(super) fn em(s: &str) -> Option<(usize, &str)> {
    if s.starts_with('_') {
        underscore_em(s)
    } else if s.starts_with('*') {
        star_em(s)
    } else {
        None
    }
}

/// Code span delimited by runs of backticks of equal length.
pub(super) fn code(s: &str) -> Option<(usize, &str)> {
    let run = s.len() - s.trim_start_matches('`').len();
    (1..=run).rev().find_map(|n| code_with_fence(s, n))
}

fn code_with_fence(s: &str, n: usize) -> Option<(usize, &str)> {
    let bytes = s.as_bytes();
    let mut q = n + 1;
    while q + n <= s.len() {
        let is_fence = bytes[q..q + n].iter().all(|b| *b == b'`')
            && bytes[q - 1] != b'`'
            && bytes.get(q + n) != Some(&b'`');
        if is_fence && s.is_char_boundary(q) {
            let body = &s[n..q];
            let content = body.trim();
            if content.is_empty() {
                let last = body.chars().next_back().map_or(0, char::len_utf8);
                return Some((q + n, &body[body.len() - last..]));
            }
            if !content.ends_with('`') {
                return Some((q + n, content));
            }
        }
        q += 1;
    }
    None
}

fn spaces(input: &str) -> IResult<&str, &str> {
    take_while_m_n(2, usize::MAX, |c: char| c == ' ')(input)
}

/// Hard line break: two or more spaces before a newline that is followed
/// by more content.
pub(super) fn br(s: &str) -> Option<usize> {
    let (rest, _) = spaces(s).ok()?;
    let after = rest.strip_prefix('\n')?;
    if after.chars().all(char::is_whitespace) {
        return None;
    }
    Some(s.len() - after.len())
}

/// `~~strikethrough~~`.
pub(super) fn del(s: &str) -> Option<(usize, &str)> {
    let body = s.strip_prefix("~~")?;
    if !body.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    body.char_indices()
        .skip(1)
        .find(|(idx, _)| {
            body[*idx..].starts_with("~~")
                && body[..*idx]
                    .chars()
                    .next_back()
                    .is_some_and(|c| !c.is_whitespace())
        })
        .map(|(idx, _)| (idx + 4, &body[..idx]))
}

/// Whether a plain text run ends right before `rest`.
fn text_stops_before(rest: &str) -> bool {
    if rest.is_empty() || rest.starts_with(TEXT_STOPS) {
        return true;
    }
    if let Some(after) = rest.strip_prefix('_') {
        if after.chars().next().is_some_and(|c| !is_word_char(c)) {
            return true;
        }
    }
    if ["http://", "https://", "www.", "("]
        .iter()
        .any(|prefix| rest.starts_with(prefix))
    {
        return true;
    }
    spaces(rest).is_ok_and(|(after, _)| after.starts_with('\n'))
}

/// Plain text run.
///
/// Underscores inside a word do not end the run, so `snake_case_name`
/// stays literal. A run does end after a non-word character that precedes
/// `_`, letting `a (_em_)` open emphasis.
pub(super) fn text(s: &str) -> Option<usize> {
    let first = s.chars().next()?.len_utf8();
    for k in (first..=s.len()).filter(|idx| s.is_char_boundary(*idx)) {
        if let Some(c) = char_at(s, k) {
            let next = k + c.len_utf8();
            if !is_word_char(c) && c != '/' && s[next..].starts_with('_') {
                return Some(next);
            }
        }
        if text_stops_before(&s[k..]) {
            return Some(k);
        }
    }
    Some(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_escapes() {
        assert_eq!(escape("\\*not em*"), Some((2, '*')));
        assert_eq!(escape("\\a"), None);
    }

    #[test]
    fn matches_autolinks() {
        assert_eq!(
            autolink("<https://example.com> rest"),
            Some((21, Autolink { text: "https://example.com", email: false }))
        );
        assert_eq!(
            autolink("<www.example.com>"),
            Some((17, Autolink { text: "www.example.com", email: false }))
        );
        assert_eq!(
            autolink("<user@example.com>"),
            Some((18, Autolink { text: "user@example.com", email: true }))
        );
        assert_eq!(autolink("<not a link>"), None);
        assert_eq!(autolink("<b>"), None);
    }

    #[test]
    fn matches_urls() {
        assert_eq!(url("https://example.com. Next"), Some(19));
        assert_eq!(url("www.example.com/path, more"), Some(20));
        assert_eq!(url("(https://example.com/a_(b)) after"), Some(27));
        assert_eq!(url("https://example.com/x) after"), Some(21));
        assert_eq!(url("ftp://example.com"), None);
    }

    #[test]
    fn matches_tags() {
        assert_eq!(tag("<a href=\"x\">link</a>"), Some(12));
        assert_eq!(tag("<!-- note --> text"), Some(13));
        assert_eq!(tag("< b>"), None);
    }

    #[test]
    fn matches_inline_links() {
        let (len, capture) = link("[text](https://example.com \"Title\") after").unwrap();
        assert_eq!(len, 35);
        assert_eq!(
            capture,
            LinkCapture {
                image: false,
                text: "text",
                href: "https://example.com",
                title: Some("Title"),
            }
        );

        let (_, image) = link("![alt [x]](<a.png>)").unwrap();
        assert!(image.image);
        assert_eq!(image.text, "alt [x]");
        assert_eq!(image.href, "a.png");
    }

    #[test]
    fn link_href_is_shortest_match() {
        let (len, capture) = link("[a](b) and (c)").unwrap();
        assert_eq!(len, 6);
        assert_eq!(capture.href, "b");
    }

    #[test]
    fn matches_reference_links() {
        let (len, capture) = reflink("[text] [Label] tail").unwrap();
        assert_eq!(len, 14);
        assert_eq!(capture.text, "text");
        assert_eq!(capture.label, "Label");

        let (len, capture) = nolink("[label] tail").unwrap();
        assert_eq!(len, 7);
        assert_eq!(capture.label, "label");
    }

    #[test]
    fn collapsed_reference_uses_its_text_as_label() {
        let (len, capture) = reflink("[Docs][] tail").unwrap();
        assert_eq!(len, 8);
        assert_eq!(capture.text, "Docs");
        assert_eq!(capture.label, "Docs");
    }

    #[test]
    fn escaped_brackets_stay_inside_link_text() {
        let (len, capture) = link("[a\\[b](c) rest").unwrap();
        assert_eq!(len, 9);
        assert_eq!(capture.text, "a\\[b");
        assert_eq!(capture.href, "c");

        let (_, capture) = link("[x\\]y](z)").unwrap();
        assert_eq!(capture.text, "x\\]y");
    }

    #[test]
    fn matches_strong() {
        assert_eq!(strong("**bold** rest"), Some((8, "bold")));
        assert_eq!(strong("__bold__"), Some((8, "bold")));
        assert_eq!(strong("****"), None);
    }

    #[test]
    fn matches_em() {
        assert_eq!(em("_em_ rest"), Some((4, "em")));
        assert_eq!(em("_snake_case"), None);
        assert_eq!(em("*em* rest"), Some((4, "em")));
        assert_eq!(em("*a**"), Some((4, "a*")));
        assert_eq!(em("*a **b** c*"), Some((11, "a **b** c")));
    }

    #[test]
    fn matches_code_spans() {
        assert_eq!(code("`code` rest"), Some((6, "code")));
        assert_eq!(code("`` a ` b `` rest"), Some((11, "a ` b")));
        assert_eq!(code("`unclosed"), None);
    }

    #[test]
    fn matches_line_breaks() {
        assert_eq!(br("  \nnext"), Some(3));
        assert_eq!(br("  \n  "), None);
        assert_eq!(br(" \nnext"), None);
    }

    #[test]
    fn matches_strikethrough() {
        assert_eq!(del("~~gone~~ rest"), Some((8, "gone")));
        assert_eq!(del("~~ gone~~"), None);
    }

    #[test]
    fn text_keeps_snake_case_together() {
        assert_eq!(text("word_with_underscore_here"), Some(25));
        assert_eq!(text("see _em_"), Some(4));
        assert_eq!(text("a (_em_)"), Some(3));
        assert_eq!(text("(_em_)"), Some(4));
        assert_eq!(text("plain *star*"), Some(6));
        assert_eq!(text("visit www.example.com"), Some(6));
        assert_eq!(text("line  \nnext"), Some(4));
    }
}
