use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Supported input document formats.
///
/// Unrecognized names are represented as `None` from [`Format::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "txt")]
    PlainText,
    #[serde(rename = "csv")]
    DelimitedTable,
    #[serde(rename = "md")]
    LightweightMarkup,
    #[serde(rename = "xlsx")]
    Spreadsheet,
    #[serde(rename = "docx")]
    WordProcessor,
    #[serde(rename = "pptx")]
    Presentation,
}

/// How a format is turned into a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Parsed and laid out in-process.
    Native,
    /// Handed to the external conversion engine.
    Delegate,
}

impl Format {
    /// All recognized formats, in the order they are advertised.
    pub const ALL: [Format; 6] = [
        Format::WordProcessor,
        Format::Presentation,
        Format::Spreadsheet,
        Format::DelimitedTable,
        Format::PlainText,
        Format::LightweightMarkup,
    ];

    /// Detect format from an exact, case-sensitive file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "docx" => Some(Self::WordProcessor),
            "pptx" => Some(Self::Presentation),
            "xlsx" => Some(Self::Spreadsheet),
            "csv" => Some(Self::DelimitedTable),
            "txt" => Some(Self::PlainText),
            "md" => Some(Self::LightweightMarkup),
            _ => None,
        }
    }

    /// Classify a file name by the suffix after the last `.` of its base name.
    ///
    /// Pure and total: never touches the filesystem, never looks at content.
    pub fn classify(file_name: &str) -> Option<Self> {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name);
        let (_, ext) = base.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Canonical extension (without the dot), also used as the stored type tag.
    pub fn extension(self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::DelimitedTable => "csv",
            Self::LightweightMarkup => "md",
            Self::Spreadsheet => "xlsx",
            Self::WordProcessor => "docx",
            Self::Presentation => "pptx",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Self::PlainText
            | Self::DelimitedTable
            | Self::LightweightMarkup
            | Self::Spreadsheet => Strategy::Native,
            Self::WordProcessor | Self::Presentation => Strategy::Delegate,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Page geometry shared by every native renderer. All lengths in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    /// Distance from the bottom edge at which content breaks to a new page.
    pub margin_bottom: f64,
    /// Body font size in points.
    pub font_size: f64,
    /// Height of one wrapped text line and of one spreadsheet cell.
    pub line_height: f64,
    /// Vertical advance after each spreadsheet row.
    pub row_advance: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        // A4 portrait, 1 cm margins, 2 cm auto page-break margin
        Self {
            width: 210.0,
            height: 297.0,
            margin_left: 10.0,
            margin_top: 10.0,
            margin_right: 10.0,
            margin_bottom: 20.0,
            font_size: 12.0,
            line_height: 10.0,
            row_advance: 12.0,
        }
    }
}

impl PageGeometry {
    /// Usable width between the left and right margins (190 mm on A4).
    pub fn content_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    /// Y coordinate (from the top edge) past which content may not extend.
    pub fn break_at(&self) -> f64 {
        self.height - self.margin_bottom
    }

    /// Number of full text lines that fit on one page.
    pub fn lines_per_page(&self) -> usize {
        ((self.break_at() - self.margin_top) / self.line_height).floor() as usize
    }
}

/// Settings for the external conversion engine.
#[derive(Debug, Clone)]
pub struct DelegateOptions {
    /// Engine executable, resolved through `PATH` when not absolute.
    pub program: PathBuf,
    /// Kill the engine if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for DelegateOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("soffice"),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running conversion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options controlling the conversion process.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory receiving every produced PDF. Must already exist.
    pub output_dir: PathBuf,
    pub page: PageGeometry,
    pub delegate: DelegateOptions,
    pub cancel: Option<CancelToken>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            page: PageGeometry::default(),
            delegate: DelegateOptions::default(),
            cancel: None,
        }
    }
}

impl ConvertOptions {
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}
