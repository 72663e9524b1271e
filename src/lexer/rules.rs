use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1, take_while, take_while1, take_while_m_n};
use nom::character::complete::{char, digit1, not_line_ending, one_of, space0, space1};
use nom::combinator::{map, opt, recognize, verify};
use nom::multi::many1;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

/// Inline-level tag names that never open an HTML block.
const INLINE_TAGS: &[&str] = &[
    "a", "em", "strong", "small", "s", "cite", "q", "dfn", "abbr", "data", "time", "code", "var",
    "samp", "kbd", "sub", "sup", "i", "b", "u", "mark", "ruby", "rt", "rp", "bdi", "bdo", "span",
    "br", "wbr", "ins", "del", "img",
];

/// A fenced code block capture.
#[derive(Debug, PartialEq)]
pub(super) struct Fence<'a> {
    pub lang: Option<&'a str>,
    pub text: &'a str,
}

/// A table capture: header row, divider row and body rows, still unsplit.
#[derive(Debug, PartialEq)]
pub(super) struct TableCapture<'a> {
    pub header: &'a str,
    pub divider: &'a str,
    pub body: &'a str,
}

/// A link reference definition capture.
#[derive(Debug, PartialEq)]
pub(super) struct Definition<'a> {
    pub label: &'a str,
    pub href: &'a str,
    pub title: Option<&'a str>,
}

/// A list capture: the whole list block and its first bullet.
#[derive(Debug, PartialEq)]
pub(super) struct ListCapture<'a> {
    pub block: &'a str,
    pub bullet: &'a str,
}

/// An HTML block capture. `tag` is set when the block is a closed element.
#[derive(Debug, PartialEq)]
pub(super) struct HtmlCapture<'a> {
    pub text: &'a str,
    pub tag: Option<&'a str>,
}

pub(super) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(super) fn leading_spaces(input: &str) -> usize {
    input.len() - input.trim_start_matches(' ').len()
}

pub(super) fn newline_run(input: &str) -> usize {
    input.len() - input.trim_start_matches('\n').len()
}

fn line_len(input: &str) -> usize {
    input.find('\n').unwrap_or(input.len())
}

/// Matches `(?:\n+|$)`, returning the number of bytes consumed.
fn line_end_or_eof(input: &str) -> Option<usize> {
    if input.is_empty() {
        return Some(0);
    }
    let run = newline_run(input);
    (run > 0).then_some(run)
}

fn is_blank(input: &str) -> bool {
    input.chars().all(char::is_whitespace)
}

fn atx_prefix(input: &str) -> IResult<&str, (&str, &str)> {
    map(
        tuple((
            space0,
            take_while_m_n(1, 6, |c: char| c == '#'),
            space1,
            not_line_ending,
        )),
        |(_, hashes, _, content)| (hashes, content),
    )(input)
}

fn hr_marks(input: &str) -> IResult<&str, Vec<char>> {
    terminated(
        verify(
            many1(preceded(space0, one_of("-*_"))),
            |marks: &Vec<char>| marks.len() >= 3,
        ),
        space0,
    )(input)
}

fn hr_marks_unindented(input: &str) -> IResult<&str, Vec<char>> {
    verify(
        many1(terminated(one_of("-*_"), space0)),
        |marks: &Vec<char>| marks.len() >= 3,
    )(input)
}

fn setext_underline(input: &str) -> IResult<&str, &str> {
    delimited(
        space0,
        verify(
            take_while1(|c: char| c == '=' || c == '-'),
            |run: &str| run.len() >= 2,
        ),
        space0,
    )(input)
}

fn bullet(input: &str) -> IResult<&str, &str> {
    alt((recognize(one_of("*+-")), recognize(pair(digit1, char('.')))))(input)
}

/// Matches `( *)(bull) `, returning the indentation and the bullet.
fn list_head(input: &str) -> IResult<&str, (&str, &str)> {
    terminated(pair(take_while(|c: char| c == ' '), bullet), char(' '))(input)
}

/// Finds the first bullet marker inside a list item.
pub(super) fn find_bullet(item: &str) -> Option<&str> {
    let rest = item.trim_start_matches(' ');
    bullet(rest).ok().map(|(_, marker)| marker)
}

/// Whether `input` starts with `indent`, a bullet and a space.
fn starts_with_bullet(input: &str, indent: &str) -> bool {
    input
        .strip_prefix(indent)
        .and_then(|rest| bullet(rest).ok())
        .is_some_and(|(rest, _)| rest.starts_with(' '))
}

/// Blank lines: the number of leading newlines.
pub(super) fn newline(input: &str) -> Option<usize> {
    let run = newline_run(input);
    (run > 0).then_some(run)
}

/// Indented code: consecutive non-empty lines starting with four spaces.
pub(super) fn indented_code(input: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(line) = input[pos..].strip_prefix("    ") {
        let content = line_len(line);
        if content == 0 {
            break;
        }
        pos += 4 + content;
        pos += newline_run(&input[pos..]);
    }
    (pos > 0).then_some(pos)
}

fn fence_run(marker: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| verify(take_while1(|c: char| c == marker), |run: &str| run.len() >= 3)(input)
}

/// Opening fence line: the fence run and an optional language word.
fn fence_open(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(
        preceded(space0, alt((fence_run('`'), fence_run('~')))),
        delimited(
            take_while(|c: char| c == ' ' || c == '.'),
            opt(take_till1(char::is_whitespace)),
            pair(space0, char('\n')),
        ),
    )(input)
}

/// Fenced code delimited by three or more backticks or tildes.
pub(super) fn fences(input: &str) -> Option<(usize, Fence<'_>)> {
    let (body, (fence, lang)) = fence_open(input).ok()?;
    let body_start = input.len() - body.len();
    let mut search = body_start;
    while let Some(found) = input[search..].find(fence) {
        let close = search + found;
        let after_close = &input[close + fence.len()..];
        let spaces = leading_spaces(after_close);
        if let Some(newlines) = line_end_or_eof(&after_close[spaces..]) {
            let text = input[body_start..close].trim_end();
            let end = close + fence.len() + spaces + newlines;
            return Some((end, Fence { lang, text }));
        }
        search = close + 1;
    }
    None
}

/// ATX heading with a space after the hashes: `## Title ##`.
pub(super) fn heading(input: &str) -> Option<(usize, (u8, &str))> {
    let (rest, (hashes, content)) = atx_prefix(input).ok()?;
    if content.trim().is_empty() {
        return None;
    }
    let mut text = content
        .trim_end_matches(' ')
        .trim_end_matches('#')
        .trim_end_matches(' ');
    if text.is_empty() {
        let first = content.chars().next().map_or(0, char::len_utf8);
        text = &content[..first];
    }
    let newlines = line_end_or_eof(rest)?;
    let consumed = input.len() - rest.len() + newlines;
    Some((consumed, (hashes.len() as u8, text)))
}

/// Loose heading check used to interrupt paragraphs: `#` followed by
/// anything on the same line, with or without a space.
fn heading_start(input: &str) -> bool {
    let rest = input.trim_start_matches(' ');
    rest.strip_prefix('#')
        .and_then(|after| after.chars().next())
        .is_some_and(|c| c != '\n')
}

/// Setext heading: a text line underlined with `=` or `-`.
pub(super) fn lheading(input: &str) -> Option<(usize, (u8, &str))> {
    let first = line_len(input);
    if first == 0 || first == input.len() {
        return None;
    }
    let text = &input[..first];
    let underline = &input[first + 1..];
    let (rest, run) = setext_underline(underline).ok()?;
    let newlines = line_end_or_eof(rest)?;
    let depth = if run.ends_with('=') { 1 } else { 2 };
    let consumed = input.len() - rest.len() + newlines;
    Some((consumed, (depth, text)))
}

/// Horizontal rule: three or more `-`, `*` or `_`, optionally spaced.
pub(super) fn hr(input: &str) -> Option<usize> {
    let (rest, _) = hr_marks(input).ok()?;
    let newlines = line_end_or_eof(rest)?;
    Some(input.len() - rest.len() + newlines)
}

fn hr_unindented(input: &str) -> bool {
    hr_marks_unindented(input)
        .ok()
        .is_some_and(|(rest, _)| line_end_or_eof(rest).is_some())
}

fn blockquote_line(input: &str) -> Option<usize> {
    let indent = leading_spaces(input);
    let rest = input[indent..].strip_prefix('>')?;
    let content = line_len(rest);
    (content > 0).then_some(indent + 1 + content)
}

/// Blockquote: `>` lines plus lazy continuation lines, repeated across
/// blank lines while the next block also starts with `>`.
pub(super) fn blockquote(input: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(first) = blockquote_line(&input[pos..]) {
        pos += first;
        while input[pos..].starts_with('\n') {
            let next = &input[pos + 1..];
            let content = line_len(next);
            if content == 0 || def(next).is_some() {
                break;
            }
            pos += 1 + content;
        }
        pos += newline_run(&input[pos..]);
    }
    (pos > 0).then_some(pos)
}

/// List block. Ends before a horizontal rule or a definition, at a blank
/// line gap not followed by indented or sibling content, or at the end of
/// input.
pub(super) fn list(input: &str) -> Option<(usize, ListCapture<'_>)> {
    let (after_head, (indent, marker)) = list_head(input).ok()?;
    let head = input.len() - after_head.len();
    let mut chars = after_head.char_indices();
    let first = chars.next().map(|(_, c)| head + c.len_utf8())?;
    let blank_tail = input.trim_end().len();

    let mut candidates = std::iter::once(first).chain(chars.map(|(idx, _)| head + idx));
    let end = loop {
        let pos = candidates.next().unwrap_or(input.len());
        if pos >= blank_tail || pos >= input.len() {
            break input.len();
        }
        if let Some(end) = list_terminator(input, pos, indent) {
            break end;
        }
    };

    Some((
        end,
        ListCapture {
            block: &input[..end],
            bullet: marker,
        },
    ))
}

fn list_terminator(input: &str, pos: usize, indent: &str) -> Option<usize> {
    let rest = &input[pos..];
    let run = newline_run(rest);
    if run == 0 {
        return None;
    }
    let after = &rest[run..];

    let hr_follows = after
        .strip_prefix(indent)
        .is_some_and(hr_unindented)
        || hr_unindented(after);
    if hr_follows || def(after).is_some() {
        return Some(pos + run);
    }

    if run >= 3 || (run == 2 && !after.starts_with(' ') && !starts_with_bullet(after, indent)) {
        return Some(pos + run);
    }
    None
}

/// Splits a list block into its top-level items.
pub(super) fn list_items(block: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut line_start = 0;

    while line_start < block.len() {
        let line = &block[line_start..];
        let Ok((_, (indent, _))) = list_head(line) else {
            line_start += line_len(line) + 1;
            continue;
        };

        let mut end = line_start + line_len(line);
        while block[end..].starts_with('\n') {
            let next = &block[end + 1..];
            if starts_with_bullet(next, indent) {
                break;
            }
            end += 1 + line_len(next);
        }
        items.push(&block[line_start..end]);
        line_start = end + 1;
    }
    items
}

/// Strips the bullet and the spaces after it from a list item.
pub(super) fn strip_bullet(item: &str) -> &str {
    let rest = item.trim_start_matches(' ');
    match bullet(rest) {
        Ok((after, _)) if after.starts_with(' ') => after.trim_start_matches(' '),
        _ => item,
    }
}

/// Validates an HTML tag name at the start of `input`, returning it.
pub(super) fn block_tag_name(input: &str) -> Option<&str> {
    let len = input.len() - input.trim_start_matches(is_word_char).len();
    if len == 0 {
        return None;
    }
    let name = &input[..len];
    if INLINE_TAGS.contains(&name) {
        return None;
    }
    let rest = &input[len..];
    if rest.starts_with(":/") {
        return None;
    }
    let punct = rest.len()
        - rest
            .trim_start_matches(|c: char| !is_word_char(c) && !c.is_whitespace() && c != '@')
            .len();
    if rest[punct..].starts_with('@') {
        return None;
    }
    Some(name)
}

/// Matches ` *(?:\n{2,}|\s*$)` after an HTML block.
fn html_block_end(input: &str) -> Option<usize> {
    let spaces = leading_spaces(input);
    let rest = &input[spaces..];
    if is_blank(rest) {
        return Some(input.len());
    }
    let run = newline_run(rest);
    (run >= 2).then_some(spaces + run)
}

/// Raw HTML block: a comment, a closed element, or a lone opening tag.
pub(super) fn html(input: &str) -> Option<(usize, HtmlCapture<'_>)> {
    let indent = leading_spaces(input);
    let rest = &input[indent..];

    if let Some(body) = rest.strip_prefix("<!--") {
        let mut search = 0;
        while let Some(found) = body[search..].find("-->") {
            let close = indent + 4 + search + found + 3;
            let after = &input[close..];
            let spaces = leading_spaces(after);
            let tail = &after[spaces..];
            if tail.starts_with('\n') {
                let end = close + spaces + 1;
                return Some((end, HtmlCapture { text: &input[..end], tag: None }));
            }
            if is_blank(tail) {
                return Some((input.len(), HtmlCapture { text: input, tag: None }));
            }
            search += found + 1;
        }
        return None;
    }

    let name = block_tag_name(rest.strip_prefix('<')?)?;
    let after_name = indent + 1 + name.len();

    let closing = format!("</{name}>");
    let mut search = after_name + input[after_name..].chars().next().map_or(0, char::len_utf8);
    while search <= input.len() {
        let Some(found) = input[search..].find(&closing) else {
            break;
        };
        let close = search + found + closing.len();
        if let Some(tail) = html_block_end(&input[close..]) {
            let end = close + tail;
            return Some((end, HtmlCapture { text: &input[..end], tag: Some(name) }));
        }
        search += found + 1;
    }

    let mut pos = after_name;
    let bytes = input.as_bytes();
    while pos < input.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                let close = input[pos + 1..].find(quote as char)?;
                pos += close + 2;
            }
            b'>' => {
                let close = pos + 1;
                let tail = html_block_end(&input[close..])?;
                let end = close + tail;
                return Some((end, HtmlCapture { text: &input[..end], tag: None }));
            }
            _ => pos += 1,
        }
    }
    None
}

/// `"title"` or `(title)` after at least one space, to the end of the line.
fn definition_title(input: &str) -> IResult<&str, &str> {
    map(
        preceded(
            pair(space1, one_of("\"(")),
            verify(not_line_ending, |quoted: &str| {
                let quoted = quoted.trim_end_matches(' ');
                quoted.len() > 1 && quoted.ends_with(['"', ')'])
            }),
        ),
        |quoted: &str| {
            let quoted = quoted.trim_end_matches(' ');
            &quoted[..quoted.len() - 1]
        },
    )(input)
}

fn definition(input: &str) -> IResult<&str, Definition<'_>> {
    map(
        tuple((
            delimited(
                pair(space0, char('[')),
                take_till1(|c: char| c == ']' || c == '\n'),
                tag("]:"),
            ),
            delimited(
                pair(space0, opt(char('<'))),
                take_till1(|c: char| c.is_whitespace() || c == '>'),
                opt(char('>')),
            ),
            terminated(opt(definition_title), space0),
        )),
        |(label, href, title)| Definition { label, href, title },
    )(input)
}

/// Link reference definition `[label]: <href> "title"`.
pub(super) fn def(input: &str) -> Option<(usize, Definition<'_>)> {
    let (rest, definition) = definition(input).ok()?;
    let newlines = line_end_or_eof(rest)?;
    Some((input.len() - rest.len() + newlines, definition))
}

fn is_divider_mark(c: char) -> bool {
    c == '-' || c == ':'
}

fn is_divider_char(c: char) -> bool {
    matches!(c, '-' | '|' | ' ' | ':')
}

/// Header and divider of a table without a leading pipe: `A | B` over
/// `--|:-:`.
fn nptable_head(input: &str) -> IResult<&str, (&str, &str)> {
    pair(
        delimited(
            space0,
            verify(not_line_ending, |header: &str| {
                header.contains('|') && !header.starts_with(char::is_whitespace)
            }),
            char('\n'),
        ),
        delimited(
            space0,
            recognize(tuple((
                take_while1(is_divider_mark),
                space0,
                char('|'),
                take_while(is_divider_char),
            ))),
            char('\n'),
        ),
    )(input)
}

/// Header and divider of a table with a leading pipe, both without that
/// pipe.
fn table_head(input: &str) -> IResult<&str, (&str, &str)> {
    pair(
        delimited(
            pair(space0, char('|')),
            verify(not_line_ending, |header: &str| !header.is_empty()),
            char('\n'),
        ),
        delimited(
            pair(space0, char('|')),
            recognize(tuple((
                space0,
                take_while1(is_divider_mark),
                take_while(is_divider_char),
            ))),
            char('\n'),
        ),
    )(input)
}

/// Consumes lines that satisfy `keep`, each ended by a newline or the end
/// of input, then any trailing newlines. Returns (body length, total).
fn table_body(input: &str, keep: impl Fn(&str) -> bool) -> (usize, usize) {
    let mut pos = 0;
    while pos < input.len() {
        let len = line_len(&input[pos..]);
        if !keep(&input[pos..pos + len]) {
            break;
        }
        pos += len;
        if input[pos..].starts_with('\n') {
            pos += 1;
        }
    }
    (pos, pos + newline_run(&input[pos..]))
}

/// GFM table without a leading pipe.
pub(super) fn nptable(input: &str) -> Option<(usize, TableCapture<'_>)> {
    let (body_input, (header, divider)) = nptable_head(input).ok()?;
    let (body_len, consumed) = table_body(body_input, |line| line.contains('|'));
    Some((
        input.len() - body_input.len() + consumed,
        TableCapture {
            header,
            divider,
            body: &body_input[..body_len],
        },
    ))
}

/// GFM table with a leading pipe on every row.
pub(super) fn table(input: &str) -> Option<(usize, TableCapture<'_>)> {
    let (body_input, (header, divider)) = table_head(input).ok()?;
    let (body_len, consumed) =
        table_body(body_input, |line| line.trim_start_matches(' ').starts_with('|'));
    Some((
        input.len() - body_input.len() + consumed,
        TableCapture {
            header,
            divider,
            body: &body_input[..body_len],
        },
    ))
}

fn tag_start(input: &str) -> bool {
    input
        .strip_prefix('<')
        .and_then(block_tag_name)
        .is_some()
}

fn list_start(input: &str) -> bool {
    list_head(input)
        .ok()
        .is_some_and(|(rest, _)| !rest.is_empty())
}

/// Whether a paragraph line is followed by a construct that ends it.
fn interrupts_paragraph(input: &str) -> bool {
    hr(input).is_some()
        || heading_start(input)
        || lheading(input).is_some()
        || blockquote_line(input).is_some()
        || tag_start(input)
        || def(input).is_some()
        || fences(input).is_some()
        || list_start(input)
}

/// Top-level paragraph. Returns the consumed length and the paragraph
/// text without its final newline.
pub(super) fn paragraph(input: &str) -> Option<(usize, &str)> {
    let mut pos = 0;
    loop {
        let len = line_len(&input[pos..]);
        if len == 0 {
            break;
        }
        let line_end = pos + len;
        if input[line_end..].starts_with('\n') && !interrupts_paragraph(&input[line_end + 1..]) {
            pos = line_end + 1;
            continue;
        }
        pos = line_end;
        break;
    }
    if pos == 0 {
        return None;
    }
    let text = input[..pos].strip_suffix('\n').unwrap_or(&input[..pos]);
    Some((pos + newline_run(&input[pos..]), text))
}

/// Fallback text run: the rest of the current line.
pub(super) fn text(input: &str) -> Option<usize> {
    let len = line_len(input);
    (len > 0).then_some(len)
}
