pub mod html;
pub mod markdown;
pub mod text;
pub mod xlsx;

use crate::config::Format;
use crate::error::RenderError;
use crate::ir::Document;

/// Trait for parsing an input file format into the IR.
pub trait Parser {
    /// Parse raw file bytes into a Document IR.
    fn parse(&self, data: &[u8]) -> Result<Document, RenderError>;
}

/// Parser for a natively rendered format, or `None` when the format needs
/// the external conversion engine.
pub fn parser_for(format: Format) -> Option<Box<dyn Parser>> {
    match format {
        // CSV is laid out as raw text; column structure is not interpreted.
        Format::PlainText | Format::DelimitedTable => Some(Box::new(text::TextParser)),
        Format::LightweightMarkup => Some(Box::new(markdown::MarkdownParser)),
        Format::Spreadsheet => Some(Box::new(xlsx::XlsxParser)),
        Format::WordProcessor | Format::Presentation => None,
    }
}
