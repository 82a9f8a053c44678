//! End-to-end tests for the dispatcher's native strategies.

mod common;

use common::Workspace;
use doc2pdf::config::{ConvertOptions, DelegateOptions, Format, PageGeometry, Strategy};
use doc2pdf::error::{ConvertError, FailureKind};
use doc2pdf::ir::Page;
use doc2pdf::parser::parser_for;
use doc2pdf::record::{MemoryRecordStore, RecordStore};
use doc2pdf::render::layout::layout_document;
use doc2pdf::{ConversionRequest, convert};

fn options(ws: &Workspace) -> ConvertOptions {
    ConvertOptions::with_output_dir(ws.output())
}

#[test]
fn test_plain_text_page_count_follows_line_count() {
    let ws = Workspace::new();
    let mut previous = 0;
    for lines in [0, 1, 25, 26, 27, 52, 53, 100] {
        let name = format!("lines{lines}.txt");
        let input = ws.upload(&name, common::numbered_lines(lines).as_bytes());
        let conversion = convert(&ConversionRequest::new(input, &name), &options(&ws)).unwrap();

        let expected = lines.div_ceil(26).max(1);
        let pages = common::page_count(&conversion.output_path);
        assert_eq!(pages, expected, "{lines} lines");
        assert!(pages >= previous, "page count must not shrink as lines grow");
        previous = pages;
        common::validate_pdf_with_qpdf(&conversion.output_path);
    }
}

#[test]
fn test_report_csv_renders_as_raw_text() {
    let ws = Workspace::new();
    let input = ws.upload("report.csv", b"a,b,c\n1,2,3\n");
    let conversion = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap();

    assert_eq!(conversion.format, Format::DelimitedTable);
    assert_eq!(conversion.strategy, Strategy::Native);
    assert_eq!(conversion.output_path, ws.output().join("report.csv.pdf"));
    let bytes = std::fs::read(&conversion.output_path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(common::page_count(&conversion.output_path), 1);

    // each source line is drawn verbatim, commas included
    let doc = parser_for(Format::DelimitedTable)
        .unwrap()
        .parse(b"a,b,c\n1,2,3\n")
        .unwrap();
    let laid = layout_document(&doc, &PageGeometry::default());
    let texts: Vec<&str> = laid.pages[0].items.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["a,b,c", "1,2,3"]);
}

#[test]
fn test_reconverting_overwrites_same_path() {
    let ws = Workspace::new();
    let input = ws.upload("notes.txt", common::numbered_lines(30).as_bytes());
    let request = ConversionRequest::from_path(&input);

    let first = convert(&request, &options(&ws)).unwrap();
    assert_eq!(common::page_count(&first.output_path), 2);

    std::fs::write(&input, common::numbered_lines(3)).unwrap();
    let second = convert(&request, &options(&ws)).unwrap();
    assert_eq!(first.output_path, second.output_path);
    assert_eq!(common::page_count(&second.output_path), 1);
    assert_eq!(ws.output_entries(), vec!["notes.txt.pdf"]);
}

#[test]
fn test_unsupported_format_leaves_output_untouched() {
    let ws = Workspace::new();
    let input = ws.upload("notes.rtf", b"{\\rtf1 hello}");
    let err = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap_err();

    assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
    assert_eq!(err.kind(), FailureKind::UnsupportedFormat);
    assert!(ws.output_entries().is_empty());
    assert_eq!(std::fs::read(&input).unwrap(), b"{\\rtf1 hello}");
}

#[test]
fn test_extension_match_is_case_sensitive() {
    let ws = Workspace::new();
    let input = ws.upload("REPORT.CSV", b"a,b\n");
    let err = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
    assert!(ws.output_entries().is_empty());
}

#[test]
fn test_two_sheet_workbook_rows_in_order() {
    let data = common::build_xlsx_multi_sheet(&[
        ("First", &[("A1", "one"), ("A2", "two"), ("A3", "three")]),
        ("Second", &[("A1", "four"), ("A2", "five"), ("A3", "six")]),
    ]);

    let doc = parser_for(Format::Spreadsheet).unwrap().parse(&data).unwrap();
    assert!(doc.pages.iter().all(|p| matches!(p, Page::Table(_))));
    let laid = layout_document(&doc, &PageGeometry::default());
    assert_eq!(laid.pages.len(), 1);
    let texts: Vec<&str> = laid.pages[0].items.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three", "four", "five", "six"]);
    // one fixed row advance apart, no gap between sheets
    let ys: Vec<f64> = laid.pages[0].items.iter().map(|t| t.y).collect();
    for pair in ys.windows(2) {
        assert!((pair[1] - pair[0] - 12.0).abs() < 1e-9);
    }

    let ws = Workspace::new();
    let input = ws.upload("sheet.xlsx", &data);
    let conversion = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap();
    assert_eq!(conversion.format, Format::Spreadsheet);
    assert_eq!(common::page_count(&conversion.output_path), 1);
}

#[test]
fn test_corrupt_workbook_is_render_error_without_output() {
    let ws = Workspace::new();
    let input = ws.upload("broken.xlsx", b"definitely not a zip");
    let err = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap_err();
    assert_eq!(err.kind(), FailureKind::RenderError);
    assert!(ws.output_entries().is_empty());
}

#[test]
fn test_markdown_document() {
    let ws = Workspace::new();
    let md = "# Quarterly Report\n\nIntro with **bold** and *italic* words.\n\n\
              - one\n- two\n\n---\n\n```\ncode block\n```\n";
    let input = ws.upload("report.md", md.as_bytes());
    let conversion = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap();
    assert_eq!(conversion.format, Format::LightweightMarkup);
    assert_eq!(common::page_count(&conversion.output_path), 1);
    common::validate_pdf_with_qpdf(&conversion.output_path);

    assert_eq!(
        common::pdf_text(&conversion.output_path),
        "Quarterly Report Intro with bold and italic words. - one - two code block"
    );
}

#[test]
fn test_markdown_raw_html_and_entities_keep_all_text() {
    let ws = Workspace::new();
    let md = "Fish &amp; chips, caf&eacute;.\n\n\
              <div>\nTom & Jerry\n</div>\n\n\
              <p>if a < b then</p>\n\n\
              Middle paragraph.\n\n\
              <!-- note\n\nClosing line.\n";
    let input = ws.upload("notes.md", md.as_bytes());
    let conversion = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap();

    assert_eq!(
        common::pdf_text(&conversion.output_path),
        "Fish & chips, café. Tom & Jerry if a < b then Middle paragraph. \
         <!-- note Closing line."
    );
}

#[test]
fn test_latin1_text_survives_rendering() {
    let ws = Workspace::new();
    let input = ws.upload("intl.txt", "café naïve €5 — Ångström\n日本 ok\n".as_bytes());
    let conversion = convert(&ConversionRequest::from_path(&input), &options(&ws)).unwrap();
    assert_eq!(
        common::pdf_text(&conversion.output_path),
        "café naïve €5 — Ångström ?? ok"
    );
    common::validate_pdf_with_qpdf(&conversion.output_path);
}

#[test]
fn test_declared_name_differs_from_stored_name() {
    let ws = Workspace::new();
    let input = ws.upload("upload-0001", b"hello\n");
    let request = ConversionRequest::new(&input, "hello.txt");
    let conversion = convert(&request, &options(&ws)).unwrap();
    assert_eq!(conversion.output_path, ws.output().join("hello.txt.pdf"));
}

#[test]
fn test_missing_engine_is_delegate_error_without_output() {
    let ws = Workspace::new();
    let input = ws.upload("slides.pptx", b"PK\x03\x04 not really a deck");
    let options = ConvertOptions {
        delegate: DelegateOptions {
            program: ws.uploads().join("no-such-engine"),
            ..DelegateOptions::default()
        },
        ..options(&ws)
    };
    let err = convert(&ConversionRequest::from_path(&input), &options).unwrap_err();
    assert!(matches!(err, ConvertError::Delegate(_)), "{err:?}");
    assert_eq!(err.kind(), FailureKind::DelegateError);
    assert!(ws.output_entries().is_empty());
}

#[test]
fn test_records_follow_successful_conversions_only() {
    let ws = Workspace::new();
    let store = MemoryRecordStore::new();

    for (name, body) in [("a.txt", "x"), ("b.rtf", "y"), ("c.md", "# z")] {
        let input = ws.upload(name, body.as_bytes());
        if let Ok(conversion) = convert(&ConversionRequest::from_path(&input), &options(&ws)) {
            store.insert(&conversion.record()).unwrap();
        }
    }

    let records = store.list().unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "c.md"]);
    assert_eq!(records[1].file_type, Format::LightweightMarkup);
}
