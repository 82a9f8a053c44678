//! Glyph advance widths for the PDF base-14 fonts used by the renderer.
//!
//! Widths are in thousandths of an em, taken from the Adobe AFM files for
//! printable ASCII and the common WinAnsi punctuation. Accented letters
//! measure as their base letter; anything else measures as a digit.
//!
//! The built-in fonts only cover the WinAnsi (cp1252) repertoire, so text is
//! passed through [`to_winansi`] before it is measured and drawn.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;
use unicode_normalization::UnicodeNormalization;

use crate::ir::TextStyle;

const POINTS_PER_MM: f64 = 72.0 / 25.4;
const FALLBACK_WIDTH: u16 = 556;
const COURIER_WIDTH: u16 = 600;
/// Drawn in place of characters outside WinAnsi.
pub const REPLACEMENT_CHAR: char = '?';

/// Helvetica and Helvetica-Oblique, `' '..='~'`.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold and Helvetica-BoldOblique, `' '..='~'`.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Built-in font faces the renderer can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
}

impl FontFace {
    pub fn for_style(style: &TextStyle) -> Self {
        match (style.is_monospace(), style.is_bold(), style.is_italic()) {
            (true, true, _) => Self::CourierBold,
            (true, false, _) => Self::Courier,
            (false, true, true) => Self::HelveticaBoldOblique,
            (false, true, false) => Self::HelveticaBold,
            (false, false, true) => Self::HelveticaOblique,
            (false, false, false) => Self::Helvetica,
        }
    }

    fn char_width(self, ch: char) -> u16 {
        let table = match self {
            Self::Courier | Self::CourierBold => return COURIER_WIDTH,
            Self::Helvetica | Self::HelveticaOblique => &HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &HELVETICA_BOLD,
        };
        match ch {
            ' '..='~' => table[ch as usize - ' ' as usize],
            _ => winansi_extra_width(ch)
                .or_else(|| {
                    let base = ch
                        .nfd()
                        .next()
                        .filter(|b| *b != ch && matches!(*b, ' '..='~'))?;
                    Some(table[base as usize - ' ' as usize])
                })
                .unwrap_or(FALLBACK_WIDTH),
        }
    }

    /// Advance width of `text` in millimetres at `size` points.
    pub fn text_width(self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|ch| u32::from(self.char_width(ch))).sum();
        f64::from(units) / 1000.0 * size / POINTS_PER_MM
    }
}

/// Non-ASCII WinAnsi glyphs without a decomposition, as the wider of the two
/// Helvetica weights so measured lines never come out short.
fn winansi_extra_width(ch: char) -> Option<u16> {
    let width = match ch {
        '\u{a0}' => 278,
        '‘' | '’' | '‚' | '·' => 278,
        '“' | '”' | '„' => 500,
        '‹' | '›' | '¡' => 333,
        '–' | '€' | '†' | '‡' | '¢' | '£' | '¥' | '§' | '«' | '»' | '¶' => 556,
        '•' => 350,
        '°' => 400,
        '×' | '÷' | '±' | '¬' => 584,
        '¿' | 'ø' | 'ß' => 611,
        '©' | '®' => 737,
        'Ø' => 778,
        'æ' => 889,
        'œ' => 944,
        '—' | '…' | '‰' | '™' | 'Æ' | 'Œ' => 1000,
        _ => return None,
    };
    Some(width)
}

/// WinAnsi code of `ch`, or `None` when the built-in fonts cannot draw it.
fn winansi_code(ch: char) -> Option<u8> {
    if ch.is_control() {
        return None;
    }
    let mut utf8 = [0u8; 4];
    let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut utf8));
    match (unmappable, bytes.as_ref()) {
        (false, [code]) => Some(*code),
        _ => None,
    }
}

/// `text` limited to characters the built-in fonts can draw.
///
/// Whitespace they cannot draw becomes a space; any other such character
/// becomes [`REPLACEMENT_CHAR`].
pub fn to_winansi(text: &str) -> Cow<'_, str> {
    if text.bytes().all(|b| matches!(b, b' '..=b'~')) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|ch| match winansi_code(ch) {
                Some(_) => ch,
                None if ch.is_whitespace() => ' ',
                None => REPLACEMENT_CHAR,
            })
            .collect(),
    )
}

/// WinAnsi bytes for a content-stream string.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| winansi_code(ch).unwrap_or(REPLACEMENT_CHAR as u8))
        .collect()
}

/// Convert a size in points to millimetres.
pub fn pt_to_mm(pt: f64) -> f64 {
    pt / POINTS_PER_MM
}
