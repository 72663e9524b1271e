use super::*;
use crate::codegen::HtmlRenderer;
use crate::config::{FormattingOptions, MarkdownOptions};
use crate::lexer::{BlockLexer, LinkDef};
use pretty_assertions::assert_eq;

fn text(s: &str) -> Token {
    Token::Text {
        text: s.to_string(),
    }
}

fn paragraph(s: &str) -> Token {
    Token::Paragraph {
        text: s.to_string(),
    }
}

fn render_tokens(tokens: Vec<Token>) -> String {
    render_with(
        &MarkdownOptions::default(),
        &Tokens {
            tokens,
            links: Default::default(),
        },
    )
}

fn render_with(options: &MarkdownOptions, tokens: &Tokens) -> String {
    let formatting = FormattingOptions::default();
    let renderer = HtmlRenderer::new(options, &formatting);
    Parser::new(tokens, &renderer)
        .parse()
        .expect("token sequence should render")
}

fn render(src: &str) -> String {
    let options = MarkdownOptions::default();
    let tokens = BlockLexer::new(&options).lex(src).expect("should lex");
    render_with(&options, &tokens)
}

#[test]
fn renders_heading_with_id() {
    let html = render_tokens(vec![Token::Heading {
        depth: 2,
        text: "Release *notes*".to_string(),
    }]);
    assert_eq!(
        html,
        "<h2 id=\"release-notes-\" class=\"markdown__heading\">Release <em>notes</em></h2>"
    );
}

#[test]
fn setext_heading_renders_like_atx() {
    let html = render_tokens(vec![Token::LHeading {
        depth: 1,
        text: "Title".to_string(),
    }]);
    assert_eq!(
        html,
        "<h1 id=\"title\" class=\"markdown__heading\">Title</h1>"
    );
}

#[test]
fn space_tokens_render_nothing() {
    assert_eq!(render_tokens(vec![Token::Space, Token::Space]), "");
}

#[test]
fn tight_list_items_render_inline() {
    let html = render_tokens(vec![
        Token::ListStart { ordered: false },
        Token::ListItemStart,
        text("one"),
        Token::ListItemEnd,
        Token::ListItemStart,
        text("two"),
        Token::ListItemEnd,
        Token::ListEnd,
    ]);
    assert_eq!(html, "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n");
}

#[test]
fn adjacent_text_tokens_are_joined() {
    let html = render_tokens(vec![
        Token::ListStart { ordered: true },
        Token::ListItemStart,
        text("first **line"),
        text("second** line"),
        Token::ListItemEnd,
        Token::ListEnd,
    ]);
    assert_eq!(
        html,
        "<ol>\n<li>first <strong>line\nsecond</strong> line</li>\n</ol>\n"
    );
}

#[test]
fn loose_items_wrap_text_in_paragraphs() {
    let html = render_tokens(vec![
        Token::ListStart { ordered: false },
        Token::LooseItemStart,
        text("one"),
        Token::Space,
        Token::ListItemEnd,
        Token::LooseItemStart,
        text("two"),
        Token::ListItemEnd,
        Token::ListEnd,
    ]);
    assert_eq!(
        html,
        "<ul>\n<li><p>one</p>\n</li>\n<li><p>two</p>\n</li>\n</ul>\n"
    );
}

#[test]
fn nested_constructs_follow_markers() {
    let html = render_tokens(vec![
        Token::BlockquoteStart,
        Token::ListStart { ordered: false },
        Token::ListItemStart,
        text("a"),
        Token::ListStart { ordered: false },
        Token::ListItemStart,
        text("b"),
        Token::ListItemEnd,
        Token::ListEnd,
        Token::ListItemEnd,
        Token::ListEnd,
        Token::BlockquoteEnd,
        paragraph("after"),
    ]);
    assert_eq!(
        html,
        "<blockquote>\n<ul>\n<li>a<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>\n</blockquote>\n<p>after</p>\n"
    );
}

#[test]
fn unterminated_bracket_stops_at_end_of_input() {
    let html = render_tokens(vec![Token::BlockquoteStart, paragraph("open")]);
    assert_eq!(html, "<blockquote>\n<p>open</p>\n</blockquote>\n");
}

#[test]
fn table_cells_use_column_alignment() {
    let html = render_tokens(vec![Token::Table {
        header: vec!["A".to_string(), "B".to_string()],
        align: vec![Align::None, Align::Right],
        cells: vec![vec!["1".to_string(), "*2*".to_string(), "extra".to_string()]],
    }]);
    assert_eq!(
        html,
        "<table class=\"markdown__table\"><thead><tr>\n<th>A</th>\n<th style=\"text-align:right\">B</th>\n</tr>\n</thead><tbody><tr>\n<td>1</td>\n<td style=\"text-align:right\"><em>2</em></td>\n<td>extra</td>\n</tr>\n</tbody></table>"
    );
}

#[test]
fn raw_html_is_inline_rendered_unless_pre() {
    let options = MarkdownOptions::builder().sanitize(false).build();
    let tokens = Tokens {
        tokens: vec![
            Token::Html {
                pre: false,
                text: "<div>*hi*</div>".to_string(),
            },
            Token::Html {
                pre: true,
                text: "<pre>*hi*</pre>".to_string(),
            },
        ],
        links: Default::default(),
    };
    assert_eq!(
        render_with(&options, &tokens),
        "<div><em>hi</em></div><pre>*hi*</pre>"
    );
}

#[test]
fn pedantic_html_is_passed_through() {
    let options = MarkdownOptions::builder()
        .sanitize(false)
        .pedantic(true)
        .build();
    let tokens = Tokens {
        tokens: vec![Token::Html {
            pre: false,
            text: "<div>*hi*</div>".to_string(),
        }],
        links: Default::default(),
    };
    assert_eq!(render_with(&options, &tokens), "<div>*hi*</div>");
}

#[test]
fn code_tokens_use_renderer() {
    let html = render_tokens(vec![Token::Code {
        lang: None,
        text: "a < b".to_string(),
    }]);
    assert_eq!(
        html,
        "<div class=\"post-body--code\"><code class=\"hljs\">a &lt; b</code></div>"
    );
}

#[test]
fn reference_links_resolve_through_token_links() {
    let mut tokens = Tokens {
        tokens: vec![paragraph("see [the docs][docs]")],
        links: Default::default(),
    };
    tokens.links.insert(
        "docs".to_string(),
        LinkDef {
            href: "https://example.com".to_string(),
            title: Some("Guide".to_string()),
        },
    );
    assert_eq!(
        render_with(&MarkdownOptions::default(), &tokens),
        "<p>see <a class=\"theme markdown__link\" href=\"https://example.com\" title=\"Guide\" target=\"_blank\">the docs</a></p>\n"
    );
}

#[test]
fn renders_lexed_document() {
    let html = render("# Plan\n\n- one\n- two\n\n---\n\ndone");
    assert_eq!(
        html,
        "<h1 id=\"plan\" class=\"markdown__heading\">Plan</h1><ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<hr>\n<p>done</p>\n"
    );
}
