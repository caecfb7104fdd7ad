//! Fixed 5x7 bitmap glyphs for the board's alphabet.
//!
//! The stream only ever contains lowercase hex digits, the `x` of the `0x`
//! prefix, and blanks, so seventeen glyphs cover everything the renderer can
//! be asked to draw. Rows are 5-bit masks, most significant bit leftmost.

pub const GLYPH_COLS: usize = 5;
pub const GLYPH_ROWS: usize = 7;

type Glyph = [u8; GLYPH_ROWS];

const DIGITS: [Glyph; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E], // 0
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E], // 1
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F], // 2
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E], // 3
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02], // 4
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E], // 5
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E], // 6
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // 7
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E], // 8
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // 9
];

const HEX_LOWER: [Glyph; 6] = [
    [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F], // a
    [0x10, 0x10, 0x1E, 0x11, 0x11, 0x11, 0x1E], // b
    [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E], // c
    [0x01, 0x01, 0x0F, 0x11, 0x11, 0x11, 0x0F], // d
    [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E], // e
    [0x06, 0x08, 0x1C, 0x08, 0x08, 0x08, 0x08], // f
];

const LOWER_X: Glyph = [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11];

/// Bitmap for `ch`, or `None` for blanks and anything outside the alphabet.
pub fn glyph(ch: char) -> Option<&'static Glyph> {
    match ch {
        '0'..='9' => Some(&DIGITS[ch as usize - '0' as usize]),
        'a'..='f' => Some(&HEX_LOWER[ch as usize - 'a' as usize]),
        'x' => Some(&LOWER_X),
        _ => None,
    }
}

/// True when the glyph bitmap has the pixel at `(col, row)` set.
pub fn pixel_set(g: &Glyph, col: usize, row: usize) -> bool {
    if col >= GLYPH_COLS || row >= GLYPH_ROWS {
        return false;
    }
    g[row] & (1 << (GLYPH_COLS - 1 - col)) != 0
}
