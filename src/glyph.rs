//! Glyph tables used by the text and clock-digit primitives.
//!
//! The proportional 8x8 ASCII font is not part of this crate; it is supplied
//! by the application through [`GlyphProvider`]. The narrow 3x5 digits used
//! for clock faces are built in.

/// First printable ASCII character with a glyph.
pub const FIRST_PRINTABLE: u8 = 0x20;
/// Last printable ASCII character with a glyph.
pub const LAST_PRINTABLE: u8 = 0x7e;
/// Number of glyphs an 8x8 font has to provide.
pub const PRINTABLE_COUNT: usize = (LAST_PRINTABLE - FIRST_PRINTABLE + 1) as usize;
/// Character drawn in place of anything outside the printable range.
pub const FALLBACK_CHAR: u8 = b'-';

/// Source of 8x8 column bitmaps for printable ASCII.
///
/// Each glyph is 8 column bytes, left to right. Bit `n` of a column is row
/// `n` counted from the top. Blank trailing columns make a glyph narrower.
pub trait GlyphProvider {
    /// Bitmap for `ascii`, which is always within
    /// [`FIRST_PRINTABLE`]..=[`LAST_PRINTABLE`].
    fn glyph(&self, ascii: u8) -> [u8; 8];
}

/// A plain font table indexed from [`FIRST_PRINTABLE`]. Bytes outside the
/// table get the [`FALLBACK_CHAR`] glyph.
impl GlyphProvider for [[u8; 8]; PRINTABLE_COUNT] {
    fn glyph(&self, ascii: u8) -> [u8; 8] {
        self[usize::from(printable_or_fallback(ascii) - FIRST_PRINTABLE)]
    }
}

impl<T: GlyphProvider + ?Sized> GlyphProvider for &T {
    fn glyph(&self, ascii: u8) -> [u8; 8] {
        (**self).glyph(ascii)
    }
}

/// Map any byte to a character the font provides.
#[must_use]
pub const fn printable_or_fallback(ascii: u8) -> u8 {
    if ascii < FIRST_PRINTABLE || ascii > LAST_PRINTABLE {
        FALLBACK_CHAR
    } else {
        ascii
    }
}

/// Digit index of the colon glyph.
pub const DIGIT_COLON: u8 = 10;
/// Digit index of the 'H' (hours) label.
pub const DIGIT_HOURS: u8 = 11;
/// Digit index of the 'M' (minutes) label.
pub const DIGIT_MINUTES: u8 = 12;
/// Digit index meaning "draw nothing" for [`crate::display::Display::blend_digits`].
pub const DIGIT_NONE: u8 = 255;

/// Width of a narrow digit in columns.
pub const DIGIT_WIDTH: usize = 3;

// 3x5 digits stored as vertical strips, lowest bit is the top row.
//
// 0   1   2   3   4   5   6   7   8   9   :   H   M
// ***.*...***.***.*.*.***.***.***.***.***.....*.*.*.*
// *.*.*.....*...*.*.*.*...*.....*.*.*.*.*..*..*.*.***
// *.*.*...***.***.***.***.***...*.***.***.....***.***
// *.*.*...*.....*...*...*.*.*...*.*.*...*..*..*.*.*.*
// ***.*...***.***...*.***.***...*.***.***.....*.*.*.*
const DIGIT_GLYPHS: [[u8; DIGIT_WIDTH]; 13] = [
    [0x1F, 0x11, 0x1F],
    [0x00, 0x00, 0x1F],
    [0x1D, 0x15, 0x17],
    [0x15, 0x15, 0x1F],
    [0x07, 0x04, 0x1F],
    [0x17, 0x15, 0x1D],
    [0x1F, 0x15, 0x1D],
    [0x01, 0x01, 0x1F],
    [0x1F, 0x15, 0x1F],
    [0x17, 0x15, 0x1F],
    [0x0A, 0x00, 0x00],
    [0x1F, 0x04, 0x1F],
    [0x1F, 0x06, 0x1F],
];

/// Column strips for a narrow digit, `None` for unknown indices.
#[must_use]
pub fn digit_glyph(digit: u8) -> Option<&'static [u8; DIGIT_WIDTH]> {
    DIGIT_GLYPHS.get(usize::from(digit))
}
