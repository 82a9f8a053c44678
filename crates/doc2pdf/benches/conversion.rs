use std::io::Cursor;

use criterion::{Criterion, criterion_group, criterion_main};
use doc2pdf::config::{Format, PageGeometry};

/// Build plain text with the given number of lines.
fn build_text(lines: usize) -> Vec<u8> {
    (0..lines)
        .map(|i| format!("Line {i}. Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n"))
        .collect::<String>()
        .into_bytes()
}

/// Build Markdown with the given number of sections.
fn build_markdown(sections: usize) -> Vec<u8> {
    let mut md = String::new();
    for i in 0..sections {
        md.push_str(&format!("## Section {i}\n\n"));
        md.push_str("Some *emphasis*, some **strong** text and `inline code`. ");
        md.push_str("Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.\n\n");
        md.push_str("- first item\n- second item\n  1. nested\n\n");
        md.push_str("```\nfn main() {}\n```\n\n");
    }
    md.into_bytes()
}

/// Build an XLSX with the given number of rows.
fn build_xlsx(rows: usize) -> Vec<u8> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_mut(&0).unwrap();
    sheet.set_name("Data");
    for row in 1..=rows {
        for col in 1..=5u32 {
            let coord = format!("{}{}", (b'A' + (col - 1) as u8) as char, row);
            sheet
                .get_cell_mut(coord.as_str())
                .set_value(format!("R{row}C{col}"));
        }
    }
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor).unwrap();
    cursor.into_inner()
}

fn bench_text_conversion(c: &mut Criterion) {
    let data_10 = build_text(26 * 10);
    let data_100 = build_text(26 * 100);
    let page = PageGeometry::default();

    let mut group = c.benchmark_group("txt");
    group.sample_size(10);

    group.bench_function("10_pages", |b| {
        b.iter(|| doc2pdf::convert_bytes(&data_10, Format::PlainText, "bench", &page).unwrap())
    });

    group.bench_function("100_pages", |b| {
        b.iter(|| doc2pdf::convert_bytes(&data_100, Format::PlainText, "bench", &page).unwrap())
    });

    group.finish();
}

fn bench_markdown_conversion(c: &mut Criterion) {
    let data_small = build_markdown(10);
    let data_large = build_markdown(100);
    let page = PageGeometry::default();

    let mut group = c.benchmark_group("md");
    group.sample_size(10);

    group.bench_function("10_sections", |b| {
        b.iter(|| {
            doc2pdf::convert_bytes(&data_small, Format::LightweightMarkup, "bench", &page).unwrap()
        })
    });

    group.bench_function("100_sections", |b| {
        b.iter(|| {
            doc2pdf::convert_bytes(&data_large, Format::LightweightMarkup, "bench", &page).unwrap()
        })
    });

    group.finish();
}

fn bench_xlsx_conversion(c: &mut Criterion) {
    let data_small = build_xlsx(50);
    let data_large = build_xlsx(500);
    let page = PageGeometry::default();

    let mut group = c.benchmark_group("xlsx");
    group.sample_size(10);

    group.bench_function("50_rows", |b| {
        b.iter(|| doc2pdf::convert_bytes(&data_small, Format::Spreadsheet, "bench", &page).unwrap())
    });

    group.bench_function("500_rows", |b| {
        b.iter(|| doc2pdf::convert_bytes(&data_large, Format::Spreadsheet, "bench", &page).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_text_conversion,
    bench_markdown_conversion,
    bench_xlsx_conversion
);
criterion_main!(benches);
