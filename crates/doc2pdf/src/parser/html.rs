//! Basic HTML reader.
//!
//! Understands the small tag set emitted by the Markdown converter:
//! headings, paragraphs, line breaks, rules, emphasis, inline and block
//! code, block quotes and lists. Images are skipped; table cells flow as
//! plain text. Unknown tags are ignored but their text is kept.
//!
//! Raw HTML passes through Markdown verbatim, so the reader also has to cope
//! with a bare `&`, a `<` that opens nothing and unterminated comments. Those
//! are kept as text rather than ending the document early.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

use crate::error::RenderError;
use crate::ir::{
    Block, Document, FlowPage, Metadata, Page, Paragraph, ParagraphStyle, Run, TextStyle,
};

/// Heading font sizes in points, `h1` first.
const HEADING_SIZES: [f64; 6] = [20.0, 17.0, 15.0, 13.0, 12.0, 12.0];
/// Gap after ordinary blocks, in millimetres.
const BLOCK_GAP: f64 = 2.0;
const LIST_INDENT: f64 = 8.0;
const QUOTE_INDENT: f64 = 6.0;
/// Lists nested deeper than this share the deepest indent.
const MAX_LIST_DEPTH: usize = 2;

enum ListKind {
    Unordered,
    Ordered(u64),
}

#[derive(Default)]
struct HtmlReader {
    blocks: Vec<Block>,
    current: Option<Paragraph>,
    title: Option<String>,
    bold: u32,
    italic: u32,
    mono: u32,
    heading: Option<usize>,
    lists: Vec<ListKind>,
    quote_depth: u32,
    pre: bool,
}

/// Parse an HTML fragment into a single-flow document.
pub fn parse_html(markup: &str) -> Result<Document, RenderError> {
    let markup = escape_stray_markup(markup);
    let mut reader = Reader::from_str(&markup);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
    }

    let mut state = HtmlReader::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => state.start(e),
            Ok(Event::Empty(ref e)) => state.empty(e),
            Ok(Event::End(ref e)) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                state.end(&name);
            }
            Ok(Event::Text(ref t)) => {
                if let Ok(s) = t.xml_content() {
                    state.push_text(&s);
                }
            }
            Ok(Event::CData(ref t)) => {
                if let Ok(s) = t.decode() {
                    state.push_text(&s);
                }
            }
            Ok(Event::GeneralRef(ref r)) => {
                if let Ok(Some(ch)) = r.resolve_char_ref() {
                    state.push_text(ch.encode_utf8(&mut [0u8; 4]));
                } else if let Ok(name) = r.decode() {
                    match resolve_predefined_entity(&name) {
                        Some(resolved) => state.push_text(resolved),
                        None => state.push_text(&format!("&{name};")),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RenderError::Parse(format!(
                    "HTML error at byte {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }
    Ok(state.finish())
}

/// Replace every `<` that does not open complete markup with `&lt;`.
fn escape_stray_markup(markup: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut pos = 0;
    while let Some(found) = markup[pos..].find('<') {
        let start = pos + found;
        match markup_len(&markup[start..]) {
            Some(len) => pos = start + len,
            None => {
                out.push_str(&markup[copied..start]);
                out.push_str("&lt;");
                copied = start + 1;
                pos = copied;
            }
        }
    }
    if copied == 0 {
        return Cow::Borrowed(markup);
    }
    out.push_str(&markup[copied..]);
    Cow::Owned(out)
}

/// Length of the markup at the start of `s` (which begins with `<`), or
/// `None` when it is never closed.
fn markup_len(s: &str) -> Option<usize> {
    let until = |open: usize, close: &str| {
        s[open..].find(close).map(|i| open + i + close.len())
    };
    let second = s.as_bytes().get(1).copied();
    if s.starts_with("<!--") {
        until(4, "-->")
    } else if s.starts_with("<![CDATA[") {
        until(9, "]]>")
    } else if s.get(..9).is_some_and(|p| p.eq_ignore_ascii_case("<!doctype")) {
        until(9, ">")
    } else if s.starts_with("<?") {
        until(2, "?>")
    } else if s.starts_with("</") {
        s.as_bytes()
            .get(2)
            .filter(|b| b.is_ascii_alphabetic())
            .and_then(|_| until(2, ">"))
    } else if second.is_some_and(|b| b.is_ascii_alphabetic()) {
        start_tag_len(s)
    } else {
        None
    }
}

/// Start tags end at the first `>` outside a quoted attribute value.
fn start_tag_len(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match (quote, b) {
            (None, b'>') => return Some(i + 1),
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            _ => {}
        }
    }
    None
}

impl HtmlReader {
    fn start(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name().as_ref().to_ascii_lowercase();
        match name.as_slice() {
            b"p" => {
                // `<li><p>` in loose lists keeps the item's marker paragraph
                if !self.current.as_ref().is_some_and(|p| p.runs.is_empty()) {
                    self.open(self.block_style());
                }
            }
            b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6" => {
                self.heading = Some(usize::from(name[1] - b'0'));
                self.open(ParagraphStyle {
                    space_before: Some(BLOCK_GAP * 2.0),
                    ..self.block_style()
                });
            }
            b"br" | b"hr" => self.empty(e),
            b"strong" | b"b" => self.bold += 1,
            b"em" | b"i" => self.italic += 1,
            b"code" => self.mono += 1,
            b"pre" => {
                self.pre = true;
                self.open(ParagraphStyle {
                    preformatted: true,
                    ..self.block_style()
                });
            }
            b"ul" => {
                self.flush();
                self.lists.push(ListKind::Unordered);
            }
            b"ol" => {
                self.flush();
                self.lists.push(ListKind::Ordered(ordered_start(e)));
            }
            b"li" => {
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    Some(ListKind::Unordered) | None => "-".to_string(),
                };
                self.open(ParagraphStyle {
                    marker: Some(marker),
                    space_after: Some(BLOCK_GAP / 2.0),
                    ..self.block_style()
                });
            }
            b"blockquote" => {
                self.flush();
                self.quote_depth += 1;
            }
            b"tr" => self.open(self.block_style()),
            b"th" => {
                self.bold += 1;
                self.push_text(" ");
            }
            b"td" => self.push_text(" "),
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
            b"br" => {
                if self.current.is_none() {
                    self.open(self.block_style());
                }
                self.push_run("\n".to_string());
            }
            b"hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"p" | b"li" | b"tr" => self.flush(),
            b"h1" | b"h2" | b"h3" | b"h4" | b"h5" | b"h6" => {
                if self.title.is_none()
                    && let Some(p) = &self.current
                    && !p.is_blank()
                {
                    self.title = Some(p.text().trim().to_string());
                }
                self.flush();
                self.heading = None;
            }
            b"strong" | b"b" | b"th" => self.bold = self.bold.saturating_sub(1),
            b"em" | b"i" => self.italic = self.italic.saturating_sub(1),
            b"code" => self.mono = self.mono.saturating_sub(1),
            b"pre" => {
                if let Some(last) = self.current.as_mut().and_then(|p| p.runs.last_mut())
                    && last.text.ends_with('\n')
                {
                    last.text.pop();
                }
                self.flush();
                self.pre = false;
            }
            b"ul" | b"ol" => {
                self.flush();
                self.lists.pop();
            }
            b"blockquote" => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn text_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.heading.map(|level| HEADING_SIZES[level - 1]),
            bold: (self.bold > 0 || self.heading.is_some()).then_some(true),
            italic: (self.italic > 0).then_some(true),
            monospace: (self.mono > 0 || self.pre).then_some(true),
        }
    }

    fn block_style(&self) -> ParagraphStyle {
        let list_depth = self.lists.len().min(MAX_LIST_DEPTH) as f64;
        ParagraphStyle {
            indent: list_depth * LIST_INDENT + f64::from(self.quote_depth) * QUOTE_INDENT,
            space_after: Some(BLOCK_GAP),
            preformatted: self.pre,
            ..ParagraphStyle::default()
        }
    }

    fn open(&mut self, style: ParagraphStyle) {
        self.flush();
        self.current = Some(Paragraph {
            style,
            runs: Vec::new(),
        });
    }

    fn flush(&mut self) {
        if let Some(para) = self.current.take()
            && (!para.is_blank() || para.style.marker.is_some())
        {
            self.blocks.push(Block::Paragraph(para));
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.pre {
            if self.current.is_none() {
                self.open(self.block_style());
            }
            self.push_run(text.to_string());
            return;
        }

        let collapsed = collapse_whitespace(text);
        if self.current.is_none() {
            if collapsed.trim().is_empty() {
                return;
            }
            self.open(self.block_style());
        }

        let at_line_start = self
            .current
            .as_ref()
            .and_then(|p| p.runs.last())
            .is_none_or(|r| r.text.ends_with([' ', '\n']));
        let collapsed = if at_line_start {
            collapsed.trim_start().to_string()
        } else {
            collapsed
        };
        if !collapsed.is_empty() {
            self.push_run(collapsed);
        }
    }

    /// Append text with the current inline style, merging with the previous
    /// run when the styles match.
    fn push_run(&mut self, text: String) {
        let style = self.text_style();
        let Some(para) = self.current.as_mut() else {
            return;
        };
        match para.runs.last_mut() {
            Some(last) if last.style == style => last.text.push_str(&text),
            _ => para.runs.push(Run::styled(text, style)),
        }
    }

    fn finish(mut self) -> Document {
        self.flush();
        Document {
            metadata: Metadata { title: self.title },
            pages: vec![Page::Flow(FlowPage {
                content: self.blocks,
            })],
        }
    }
}

fn ordered_start(e: &BytesStart<'_>) -> u64 {
    e.try_get_attribute("start")
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out
}
