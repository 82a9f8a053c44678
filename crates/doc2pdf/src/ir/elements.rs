use super::style::{ParagraphStyle, TextStyle};

/// Block-level content elements.
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    /// Horizontal rule; rendered as vertical whitespace.
    Rule,
}

/// A paragraph consisting of styled text runs.
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// A paragraph with a single unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            style: ParagraphStyle::default(),
            runs: vec![Run::plain(text)],
        }
    }

    /// True when no run carries visible text.
    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A run of text with uniform formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: TextStyle,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// A table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

/// A table row.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// A table cell holding its display string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub text: String,
}

impl TableCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text_joins_runs() {
        let para = Paragraph {
            style: ParagraphStyle::default(),
            runs: vec![
                Run::plain("Hello, "),
                Run::styled(
                    "World",
                    TextStyle {
                        bold: Some(true),
                        ..TextStyle::default()
                    },
                ),
            ],
        };
        assert_eq!(para.text(), "Hello, World");
        assert!(!para.is_blank());
    }

    #[test]
    fn test_whitespace_paragraph_is_blank() {
        assert!(Paragraph::plain("  \n ").is_blank());
        assert!(Paragraph::default().is_blank());
    }
}
