//! PDF serialization of a laid-out document with `printpdf` 0.8.
//!
//! Every placed run becomes its own text section using one of the built-in
//! base-14 fonts, so no font data is embedded.
//!
//! printpdf hands built-in font text to the content stream as UTF-8, while
//! the fonts are declared with `WinAnsiEncoding`. Runs are therefore shown
//! with a raw `Tj` holding their WinAnsi bytes; the empty
//! `WriteTextBuiltinFont` before it only registers the font resource.

use printpdf::{
    BuiltinFont, DictItem, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt,
};
use tracing::debug;

use crate::config::PageGeometry;
use crate::error::RenderError;
use crate::render::layout::{LaidOutDocument, PlacedText};
use crate::render::metrics::{FontFace, encode_winansi};

fn builtin(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::Helvetica => BuiltinFont::Helvetica,
        FontFace::HelveticaBold => BuiltinFont::HelveticaBold,
        FontFace::HelveticaOblique => BuiltinFont::HelveticaOblique,
        FontFace::HelveticaBoldOblique => BuiltinFont::HelveticaBoldOblique,
        FontFace::Courier => BuiltinFont::Courier,
        FontFace::CourierBold => BuiltinFont::CourierBold,
    }
}

fn text_ops(item: &PlacedText, page_height: f64) -> [Op; 6] {
    let font = builtin(item.face);
    // PDF user space grows upwards from the bottom-left corner
    let x = Mm(item.x as f32).into_pt();
    let y = Mm((page_height - item.y) as f32).into_pt();
    [
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point { x, y },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(item.size as f32),
            font,
        },
        Op::WriteTextBuiltinFont {
            items: Vec::new(),
            font,
        },
        Op::Unknown {
            key: "Tj".to_string(),
            value: vec![DictItem::String {
                data: encode_winansi(&item.text),
                literal: false,
            }],
        },
        Op::EndTextSection,
    ]
}

/// Serialize `layout` into PDF bytes.
pub fn write_pdf(
    layout: &LaidOutDocument,
    page: &PageGeometry,
    fallback_title: &str,
) -> Result<Vec<u8>, RenderError> {
    let title = layout.title.as_deref().unwrap_or(fallback_title);
    let (width, height) = (Mm(page.width as f32), Mm(page.height as f32));

    let pages: Vec<PdfPage> = layout
        .pages
        .iter()
        .map(|laid| {
            let ops = laid
                .items
                .iter()
                .flat_map(|item| text_ops(item, page.height))
                .collect();
            PdfPage::new(width, height, ops)
        })
        .collect();

    let mut doc = PdfDocument::new(title);
    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    // raw operators are only written outside secure mode
    let options = PdfSaveOptions {
        secure: false,
        ..PdfSaveOptions::default()
    };
    let bytes = doc.save(&options, &mut warnings);
    debug!(
        pages = layout.pages.len(),
        bytes = bytes.len(),
        warnings = warnings.len(),
        "PDF serialized"
    );

    if bytes.is_empty() {
        return Err(RenderError::Pdf("serializer produced no output".to_string()));
    }
    Ok(bytes)
}
