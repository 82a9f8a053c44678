use super::elements::{Block, Table};

/// Top-level document model produced by parsers and consumed by the renderer.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub metadata: Metadata,
    pub pages: Vec<Page>,
}

/// Document metadata.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
}

/// A section of the document; the variant depends on the source format.
///
/// Sections do not force page breaks: consecutive sections continue on the
/// same running page flow.
#[derive(Debug, Clone)]
pub enum Page {
    /// TXT, CSV, Markdown: flowing text.
    Flow(FlowPage),
    /// XLSX: one sheet of rows.
    Table(TablePage),
}

/// A flowing-content section.
#[derive(Debug, Clone, Default)]
pub struct FlowPage {
    pub content: Vec<Block>,
}

/// A table-based section (one XLSX sheet).
#[derive(Debug, Clone)]
pub struct TablePage {
    pub name: String,
    pub table: Table,
}

impl Document {
    /// A document holding a single flow section.
    pub fn flow(content: Vec<Block>) -> Self {
        Self {
            metadata: Metadata::default(),
            pages: vec![Page::Flow(FlowPage { content })],
        }
    }
}
