/// Glyphs live at the very bottom of memory, so FX29 is just `digit * 5`.
pub const FONT_START_ADDRESS: usize = 0x000;
pub const GLYPH_SIZE: usize = 5;
pub const FONT_SIZE: usize = FONT.len();

/// Bitmaps for the built-in hex digit sprites, 0 through F.
pub const FONT: [u8; 16 * GLYPH_SIZE] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Address of the glyph for `digit`. Values above 0xF are not masked.
pub fn glyph_address(digit: u8) -> u16 {
    FONT_START_ADDRESS as u16 + u16::from(digit) * GLYPH_SIZE as u16
}
