use std::io::Cursor;

use tracing::debug;

use crate::error::RenderError;
use crate::ir::{Document, Metadata, Page, Table, TableCell, TablePage, TableRow};
use crate::parser::Parser;

/// Reads every sheet of a workbook as a grid of cell strings.
pub struct XlsxParser;

impl Parser for XlsxParser {
    fn parse(&self, data: &[u8]) -> Result<Document, RenderError> {
        let cursor = Cursor::new(data);
        let book = umya_spreadsheet::reader::xlsx::read_reader(cursor, true)
            .map_err(|e| RenderError::Parse(format!("Failed to parse XLSX: {e}")))?;

        let mut pages = Vec::new();

        // Sheets in file order, rows top to bottom, cells left to right.
        for sheet in book.get_sheet_collection() {
            let (max_col, max_row) = sheet.get_highest_column_and_row();
            if max_col == 0 || max_row == 0 {
                continue; // skip empty sheets
            }

            let mut rows = Vec::with_capacity(max_row as usize);
            for row_idx in 1..=max_row {
                let cells = (1..=max_col)
                    .map(|col_idx| {
                        // umya-spreadsheet tuple is (column, row), both 1-indexed
                        let value = sheet
                            .get_cell((col_idx, row_idx))
                            .map(|cell| cell.get_value().to_string())
                            .unwrap_or_default();
                        TableCell::new(value)
                    })
                    .collect();
                rows.push(TableRow { cells });
            }

            debug!(
                sheet = sheet.get_name(),
                rows = max_row,
                columns = max_col,
                "parsed worksheet"
            );

            pages.push(Page::Table(TablePage {
                name: sheet.get_name().to_string(),
                table: Table { rows },
            }));
        }

        Ok(Document {
            metadata: Metadata::default(),
            pages,
        })
    }
}
