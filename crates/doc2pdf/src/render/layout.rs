//! Line breaking and pagination.
//!
//! Positions are millimetres measured from the top-left corner of the page;
//! `y` of a [`PlacedText`] is its baseline.

use tracing::warn;

use crate::config::PageGeometry;
use crate::ir::{Block, Document, Page, Paragraph, Run, Table, TextStyle};
use crate::render::metrics::{FontFace, pt_to_mm, to_winansi};

/// Gap between a list marker and the item text.
const MARKER_GUTTER: f64 = 6.0;
/// Horizontal padding inside a spreadsheet cell.
const CELL_PADDING: f64 = 1.0;
const EPSILON: f64 = 1e-6;

/// A run of text at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub face: FontFace,
    /// Font size in points.
    pub size: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LaidOutPage {
    pub items: Vec<PlacedText>,
}

#[derive(Debug, Clone)]
pub struct LaidOutDocument {
    pub title: Option<String>,
    pub pages: Vec<LaidOutPage>,
    /// Spreadsheet cells cut short to fit their slot.
    pub truncated_cells: usize,
}

/// Lay out every section of `doc` onto pages of the given geometry.
///
/// Sections share one running flow; a page break only happens when the next
/// line does not fit. The result always holds at least one page.
pub fn layout_document(doc: &Document, page: &PageGeometry) -> LaidOutDocument {
    let mut engine = LayoutEngine::new(*page);
    for section in &doc.pages {
        match section {
            Page::Flow(flow) => {
                for block in &flow.content {
                    match block {
                        Block::Paragraph(para) => engine.paragraph(para),
                        Block::Rule => engine.gap(page.line_height),
                    }
                }
            }
            Page::Table(sheet) => engine.table(&sheet.table),
        }
    }
    let truncated_cells = engine.truncated_cells;
    if truncated_cells > 0 {
        warn!(truncated_cells, "spreadsheet cells truncated to fit the page width");
    }
    LaidOutDocument {
        title: doc.metadata.title.clone(),
        pages: engine.finish(),
        truncated_cells,
    }
}

/// A measured piece of a line.
#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    face: FontFace,
    size: f64,
    width: f64,
}

impl Fragment {
    fn is_space(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }

    /// Part of this fragment's text, in the same face.
    fn piece(&self, text: String, width: f64) -> Self {
        Self {
            text,
            face: self.face,
            size: self.size,
            width,
        }
    }
}

/// A line-breaking unit.
enum Token {
    Word(Fragment),
    Space(Fragment),
    Break,
}

struct LayoutEngine {
    page: PageGeometry,
    done: Vec<LaidOutPage>,
    current: LaidOutPage,
    y: f64,
    truncated_cells: usize,
}

impl LayoutEngine {
    fn new(page: PageGeometry) -> Self {
        Self {
            page,
            done: Vec::new(),
            current: LaidOutPage::default(),
            y: page.margin_top,
            truncated_cells: 0,
        }
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.page.margin_top + EPSILON
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = self.page.margin_top;
    }

    /// Break the page if a band of height `h` would cross the bottom margin.
    fn ensure_room(&mut self, h: f64) {
        if self.y + h > self.page.break_at() + EPSILON && !self.at_page_top() {
            self.new_page();
        }
    }

    fn gap(&mut self, h: f64) {
        if !self.at_page_top() {
            self.y += h;
        }
    }

    fn paragraph(&mut self, para: &Paragraph) {
        let style = &para.style;
        if let Some(before) = style.space_before {
            self.gap(before);
        }

        let left = self.page.margin_left + style.indent;
        let width = (self.page.content_width() - style.indent).max(1.0);
        let lines = wrap_runs(&para.runs, width, self.page.font_size);

        for (i, line) in lines.iter().enumerate() {
            let size = line
                .iter()
                .map(|f| f.size)
                .fold(self.page.font_size, f64::max);
            let line_h = style
                .line_height
                .unwrap_or(self.page.line_height)
                .max(pt_to_mm(size) * 1.2);
            self.ensure_room(line_h);
            let baseline = self.y + 0.5 * line_h + 0.3 * pt_to_mm(size);

            if i == 0
                && let Some(marker) = &style.marker
            {
                self.current.items.push(PlacedText {
                    x: self.page.margin_left + (style.indent - MARKER_GUTTER).max(0.0),
                    y: baseline,
                    text: marker.clone(),
                    face: FontFace::Helvetica,
                    size: self.page.font_size,
                });
            }

            let mut x = left;
            for frag in line {
                if !frag.is_space() {
                    self.current.items.push(PlacedText {
                        x,
                        y: baseline,
                        text: frag.text.clone(),
                        face: frag.face,
                        size: frag.size,
                    });
                }
                x += frag.width;
            }
            self.y += line_h;
        }

        if let Some(after) = style.space_after {
            self.y += after;
        }
    }

    /// Rows top to bottom; the cells of a row share the content width equally.
    fn table(&mut self, table: &Table) {
        let size = self.page.font_size;
        let cell_h = self.page.line_height;
        for row in &table.rows {
            self.ensure_room(cell_h);
            if !row.cells.is_empty() {
                let slot = self.page.content_width() / row.cells.len() as f64;
                let baseline = self.y + 0.5 * cell_h + 0.3 * pt_to_mm(size);
                for (i, cell) in row.cells.iter().enumerate() {
                    let full = to_winansi(cell.text.trim());
                    let text = truncate_to_width(
                        &full,
                        FontFace::Helvetica,
                        size,
                        slot - 2.0 * CELL_PADDING,
                    );
                    if text.len() < full.len() {
                        self.truncated_cells += 1;
                    }
                    if text.is_empty() {
                        continue;
                    }
                    self.current.items.push(PlacedText {
                        x: self.page.margin_left + slot * i as f64 + CELL_PADDING,
                        y: baseline,
                        text,
                        face: FontFace::Helvetica,
                        size,
                    });
                }
            }
            self.y += self.page.row_advance;
        }
    }

    fn finish(mut self) -> Vec<LaidOutPage> {
        self.done.push(self.current);
        self.done
    }
}

/// Split runs into words, spaces and hard breaks, measuring each piece.
fn tokenize(runs: &[Run], body_size: f64) -> Vec<Token> {
    let mut tokens = Vec::new();
    for run in runs {
        let face = FontFace::for_style(&run.style);
        let size = run_size(&run.style, body_size);
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                tokens.push(Token::Break);
            }
            let segment = to_winansi(segment);
            let mut rest: &str = &segment;
            while let Some(first) = rest.chars().next() {
                let space = first.is_whitespace();
                let end = rest
                    .find(|c: char| c.is_whitespace() != space)
                    .unwrap_or(rest.len());
                let (piece, tail) = rest.split_at(end);
                let frag = Fragment {
                    text: piece.to_string(),
                    face,
                    size,
                    width: face.text_width(piece, size),
                };
                tokens.push(if space {
                    Token::Space(frag)
                } else {
                    Token::Word(frag)
                });
                rest = tail;
            }
        }
    }
    tokens
}

fn run_size(style: &TextStyle, body_size: f64) -> f64 {
    style.font_size.unwrap_or(body_size)
}

/// Greedy line breaking. Spaces at a soft wrap are dropped; words wider than
/// the line are split between characters. Always yields at least one line.
fn wrap_runs(runs: &[Run], width: f64, body_size: f64) -> Vec<Vec<Fragment>> {
    let mut lines = Vec::new();
    let mut line: Vec<Fragment> = Vec::new();
    let mut line_w = 0.0;
    let mut pending: Vec<Fragment> = Vec::new();

    for token in tokenize(runs, body_size) {
        match token {
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                line_w = 0.0;
                pending.clear();
            }
            Token::Space(frag) => pending.push(frag),
            Token::Word(frag) => {
                let pending_w: f64 = pending.iter().map(|f| f.width).sum();
                if line_w + pending_w + frag.width <= width + EPSILON {
                    line_w += pending_w + frag.width;
                    line.append(&mut pending);
                    line.push(frag);
                    continue;
                }

                let keep_leading = line.is_empty();
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_w = 0.0;
                }
                if keep_leading {
                    // indentation at the start of a hard line is kept
                    line_w = pending.iter().map(|f| f.width).sum();
                    line.append(&mut pending);
                }
                pending.clear();

                if line_w + frag.width <= width + EPSILON {
                    line_w += frag.width;
                    line.push(frag);
                } else {
                    for piece in split_word(&frag, width - line_w, width) {
                        if !line.is_empty() && line_w + piece.width > width + EPSILON {
                            lines.push(std::mem::take(&mut line));
                            line_w = 0.0;
                        }
                        line_w += piece.width;
                        line.push(piece);
                    }
                }
            }
        }
    }
    if line.is_empty() && !pending.is_empty() {
        line.append(&mut pending);
    }
    lines.push(line);
    lines
}

/// Cut an overlong word into pieces, the first fitting `first_width` and the
/// rest fitting `width`. Every piece holds at least one character.
fn split_word(frag: &Fragment, first_width: f64, width: f64) -> Vec<Fragment> {
    let mut pieces = Vec::new();
    let mut limit = first_width;
    let mut text = String::new();
    let mut text_w = 0.0;
    for ch in frag.text.chars() {
        let w = frag.face.text_width(ch.encode_utf8(&mut [0u8; 4]), frag.size);
        if !text.is_empty() && text_w + w > limit + EPSILON {
            pieces.push(frag.piece(std::mem::take(&mut text), text_w));
            text_w = 0.0;
            limit = width;
        }
        text.push(ch);
        text_w += w;
    }
    if !text.is_empty() {
        pieces.push(frag.piece(text, text_w));
    }
    pieces
}

/// Longest prefix of `text` whose width fits `max_width`.
fn truncate_to_width(text: &str, face: FontFace, size: f64, max_width: f64) -> String {
    let mut out = String::new();
    let mut w = 0.0;
    for ch in text.chars() {
        let cw = face.text_width(ch.encode_utf8(&mut [0u8; 4]), size);
        if w + cw > max_width + EPSILON {
            break;
        }
        w += cw;
        out.push(ch);
    }
    out
}
