use tracing::debug;

use crate::error::RenderError;
use crate::ir::{Block, Document, Paragraph, ParagraphStyle, Run};
use crate::parser::Parser;

/// Reads the whole input as one preformatted text block.
///
/// Used for `.txt` and, unchanged, for `.csv`.
pub struct TextParser;

impl Parser for TextParser {
    fn parse(&self, data: &[u8]) -> Result<Document, RenderError> {
        let text = decode_text(data);
        debug!(bytes = data.len(), lines = text.lines().count(), "parsed raw text");

        Ok(Document::flow(vec![Block::Paragraph(Paragraph {
            style: ParagraphStyle {
                preformatted: true,
                ..ParagraphStyle::default()
            },
            runs: vec![Run::plain(text)],
        })]))
    }
}

/// Decode bytes as UTF-8 (lossy), normalising line endings and tabs and
/// dropping a BOM and one trailing newline.
pub(crate) fn decode_text(data: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(data);
    let raw: &str = &decoded;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n").replace('\t', "    ");
    if text.ends_with('\n') {
        text.pop();
    }
    text
}
