//! Markdown input: CommonMark is first turned into HTML, which the basic
//! HTML reader in [`super::html`] then maps onto the IR.

use pulldown_cmark::{Options, html};
use tracing::debug;

use crate::error::RenderError;
use crate::ir::Document;
use crate::parser::Parser;
use crate::parser::text::decode_text;

pub struct MarkdownParser;

impl Parser for MarkdownParser {
    fn parse(&self, data: &[u8]) -> Result<Document, RenderError> {
        let source = decode_text(data);
        let markup = markdown_to_html(&source);
        debug!(markdown_len = source.len(), html_len = markup.len(), "markdown converted");
        super::html::parse_html(&markup)
    }
}

/// Render Markdown to an HTML fragment.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = pulldown_cmark::Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Page};

    #[test]
    fn test_markdown_to_html_headings_and_emphasis() {
        let out = markdown_to_html("# Title\n\nSome *soft* and **loud** words.\n");
        assert!(out.contains("<h1>Title</h1>"), "{out}");
        assert!(out.contains("<em>soft</em>"), "{out}");
        assert!(out.contains("<strong>loud</strong>"), "{out}");
    }

    #[test]
    fn test_markdown_to_html_lists() {
        let out = markdown_to_html("- one\n- two\n");
        assert!(out.contains("<ul>"), "{out}");
        assert!(out.contains("<li>one</li>"), "{out}");
    }

    fn texts(source: &str) -> Vec<String> {
        let doc = MarkdownParser.parse(source.as_bytes()).unwrap();
        let Page::Flow(flow) = &doc.pages[0] else {
            panic!("expected flow page");
        };
        flow.content
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.text().trim().to_string()),
                Block::Rule => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_produces_heading_and_paragraph() {
        assert_eq!(
            texts("# Report\n\nBody text & more.\n"),
            vec!["Report", "Body text & more."]
        );
    }

    #[test]
    fn test_ampersand_in_html_block_keeps_following_text() {
        let texts = texts("<div>\nTom & Jerry\n</div>\n\nAfter paragraph survives.\n");
        assert_eq!(texts, vec!["Tom & Jerry", "After paragraph survives."]);
    }

    #[test]
    fn test_less_than_in_inline_html_keeps_following_text() {
        let texts = texts("<p>if a < b then</p>\n\nAfter paragraph survives.\n");
        assert_eq!(texts.first().map(String::as_str), Some("if a < b then"));
        assert_eq!(texts.last().map(String::as_str), Some("After paragraph survives."));
    }

    #[test]
    fn test_unterminated_comment_keeps_following_text() {
        let texts = texts("Before.\n\n<!-- note\n\nAfter paragraph survives.\n");
        assert_eq!(texts[0], "Before.");
        assert!(texts.iter().any(|t| t.ends_with("After paragraph survives.")), "{texts:?}");
    }

    #[test]
    fn test_entities_and_latin1_text() {
        assert_eq!(
            texts("Caf&eacute; &amp; cr&#232;me: na\u{ef}ve &copy;\n"),
            vec!["Café & crème: naïve ©"]
        );
    }
}
