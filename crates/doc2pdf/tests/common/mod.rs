//! Shared test utilities for integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Scratch area with separate upload and output directories.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("should create temp dir");
        std::fs::create_dir(root.path().join("uploads")).unwrap();
        std::fs::create_dir(root.path().join("output")).unwrap();
        Self { root }
    }

    pub fn uploads(&self) -> PathBuf {
        self.root.path().join("uploads")
    }

    pub fn output(&self) -> PathBuf {
        self.root.path().join("output")
    }

    /// Store an upload and return its path.
    pub fn upload(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.uploads().join(name);
        std::fs::write(&path, bytes).expect("should write upload");
        path
    }

    /// Sorted names of everything in the output directory.
    pub fn output_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Number of pages in the PDF at `path`.
pub fn page_count(path: &Path) -> usize {
    let doc = lopdf::Document::load(path).expect("output should be a readable PDF");
    doc.get_pages().len()
}

/// Text drawn on every page, with each run of whitespace collapsed to one
/// space. Runs are drawn word by word, so word order is all that survives.
pub fn pdf_text(path: &Path) -> String {
    let doc = lopdf::Document::load(path).expect("output should be a readable PDF");
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = doc.extract_text(&pages).expect("text should be extractable");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `n` short numbered lines joined by newlines.
pub fn numbered_lines(n: usize) -> String {
    (1..=n).map(|i| format!("line {i}\n")).collect()
}

/// Build XLSX bytes with one sheet per `(name, cells)` entry.
pub fn build_xlsx_multi_sheet(sheets: &[(&str, &[(&str, &str)])]) -> Vec<u8> {
    let mut book = umya_spreadsheet::new_file();
    for (i, &(name, cells)) in sheets.iter().enumerate() {
        if i == 0 {
            let sheet = book.get_sheet_mut(&0).unwrap();
            sheet.set_name(name);
            for &(coord, value) in cells {
                sheet.get_cell_mut(coord).set_value(value);
            }
        } else {
            let mut sheet = umya_spreadsheet::Worksheet::default();
            sheet.set_name(name);
            for &(coord, value) in cells {
                sheet.get_cell_mut(coord).set_value(value);
            }
            book.add_sheet(sheet).unwrap();
        }
    }
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor).unwrap();
    cursor.into_inner()
}

/// Validate PDF bytes using `qpdf --check`.
///
/// Returns `true` if validation was performed and passed, `false` if skipped.
///
/// Validation is skipped when:
/// - `DOC2PDF_VALIDATE_PDF` env var is not set to `"1"`
/// - `qpdf` is not installed on the system
///
/// Panics if `qpdf --check` reports the PDF is invalid.
pub fn validate_pdf_with_qpdf(path: &Path) -> bool {
    if std::env::var("DOC2PDF_VALIDATE_PDF").unwrap_or_default() != "1" {
        return false;
    }

    match std::process::Command::new("qpdf").arg("--version").output() {
        Ok(output) if output.status.success() => {}
        _ => {
            eprintln!("[WARN] qpdf not installed, skipping PDF validation");
            return false;
        }
    }

    let output = std::process::Command::new("qpdf")
        .arg("--check")
        .arg(path)
        .output()
        .expect("should run qpdf");

    assert!(
        output.status.success(),
        "qpdf --check failed:\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );

    true
}
