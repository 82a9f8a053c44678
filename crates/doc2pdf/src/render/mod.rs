pub mod layout;
pub mod metrics;
pub mod pdf;

use tracing::debug;

use crate::config::PageGeometry;
use crate::error::RenderError;
use crate::ir::Document;

/// Lay out and serialize a document. `fallback_title` is used when the
/// document carries no title of its own.
pub fn render_document(
    doc: &Document,
    page: &PageGeometry,
    fallback_title: &str,
) -> Result<Vec<u8>, RenderError> {
    let layout = layout::layout_document(doc, page);
    debug!(sections = doc.pages.len(), pages = layout.pages.len(), "layout complete");
    pdf::write_pdf(&layout, page, fallback_title)
}
