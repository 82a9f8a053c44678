/// Paragraph-level formatting. Lengths in millimetres.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphStyle {
    /// Left indent relative to the content box.
    pub indent: f64,
    pub space_before: Option<f64>,
    pub space_after: Option<f64>,
    /// Overrides the page's line height.
    pub line_height: Option<f64>,
    /// List marker drawn in the indent gutter (e.g. `-` or `3.`).
    pub marker: Option<String>,
    /// Keep spaces and line breaks exactly as written.
    pub preformatted: bool,
}

/// Character-level formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextStyle {
    /// Font size in points; falls back to the page body size.
    pub font_size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub monospace: Option<bool>,
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        matches!(self.bold, Some(true))
    }

    pub fn is_italic(&self) -> bool {
        matches!(self.italic, Some(true))
    }

    pub fn is_monospace(&self) -> bool {
        matches!(self.monospace, Some(true))
    }
}
