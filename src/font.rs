use crate::error::Chip8Error;

/// where the 5-byte hex digits live
pub const SMALL_FONT_ADDR: u16 = 0x000;
/// where the 10-byte SCHIP digits live, straight after the small font
pub const BIG_FONT_ADDR: u16 = SMALL_FONT_ADDR + 16 * SMALL_GLYPH_BYTES;

pub const SMALL_GLYPH_BYTES: u16 = 5;
pub const BIG_GLYPH_BYTES: u16 = 10;

pub type SmallFont = [u8; 80];
pub type BigFont = [u8; 160];

// the font most modern interpreters (octo, chip-48) ship
#[rustfmt::skip]
const OCTO_SMALL: SmallFont = [
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

// from https://laurencescotford.com/chip-8-on-the-cosmac-vip-the-character-set/
// unpacked; the VIP overlapped glyphs to save ROM
#[rustfmt::skip]
const VIP_SMALL: SmallFont = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x60, 0x20, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0xA0, 0xA0, 0xF0, 0x20, 0x20, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x10, 0x10, 0x10, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xF0, 0x50, 0x70, 0x50, 0xF0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xF0, 0x50, 0x50, 0x50, 0xF0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

// SCHIP 1.1 only defined 0-9; A-F follow octo's extension
#[rustfmt::skip]
const SCHIP_BIG: BigFont = [
    0x3C, 0x7E, 0xE7, 0xC3, 0xC3, 0xC3, 0xC3, 0xE7, 0x7E, 0x3C, // 0
    0x18, 0x38, 0x58, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, // 1
    0x3E, 0x7F, 0xC3, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFF, 0xFF, // 2
    0x3C, 0x7E, 0xC3, 0x03, 0x0E, 0x0E, 0x03, 0xC3, 0x7E, 0x3C, // 3
    0x06, 0x0E, 0x1E, 0x36, 0x66, 0xC6, 0xFF, 0xFF, 0x06, 0x06, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFE, 0x03, 0xC3, 0x7E, 0x3C, // 5
    0x3E, 0x7C, 0xE0, 0xC0, 0xFC, 0xFE, 0xC3, 0xC3, 0x7E, 0x3C, // 6
    0xFF, 0xFF, 0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x60, 0x60, // 7
    0x3C, 0x7E, 0xC3, 0xC3, 0x7E, 0x7E, 0xC3, 0xC3, 0x7E, 0x3C, // 8
    0x3C, 0x7E, 0xC3, 0xC3, 0x7F, 0x3F, 0x03, 0x03, 0x3E, 0x7C, // 9
    0x7E, 0xFF, 0xC3, 0xC3, 0xC3, 0xFF, 0xFF, 0xC3, 0xC3, 0xC3, // A
    0xFC, 0xFC, 0xC3, 0xC3, 0xFC, 0xFC, 0xC3, 0xC3, 0xFC, 0xFC, // B
    0x3C, 0xFF, 0xC3, 0xC0, 0xC0, 0xC0, 0xC0, 0xC3, 0xFF, 0x3C, // C
    0xFC, 0xFE, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xFE, 0xFC, // D
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, // E
    0xFF, 0xFF, 0xC0, 0xC0, 0xFF, 0xFF, 0xC0, 0xC0, 0xC0, 0xC0, // F
];

pub const SMALL_FONTS: [(&str, &SmallFont); 2] = [("octo", &OCTO_SMALL), ("vip", &VIP_SMALL)];
pub const BIG_FONTS: [(&str, &BigFont); 1] = [("schip", &SCHIP_BIG)];

/// names of the small and big glyph sets baked into low memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSelection {
    pub small: &'static str,
    pub big: &'static str,
}

impl Default for FontSelection {
    fn default() -> Self {
        FontSelection {
            small: SMALL_FONTS[0].0,
            big: BIG_FONTS[0].0,
        }
    }
}

impl FontSelection {
    /// parse `small,big`; either side may be left empty to keep the default
    pub fn parse(s: &str) -> Result<Self, Chip8Error> {
        let mut fonts = FontSelection::default();
        let (small, big) = s.split_once(',').unwrap_or((s, ""));
        if !small.trim().is_empty() {
            fonts.small = small_font(small.trim())?.0;
        }
        if !big.trim().is_empty() {
            fonts.big = big_font(big.trim())?.0;
        }
        Ok(fonts)
    }

    pub fn small_glyphs(&self) -> &'static SmallFont {
        small_font(self.small).map(|f| f.1).unwrap_or(&OCTO_SMALL)
    }

    pub fn big_glyphs(&self) -> &'static BigFont {
        big_font(self.big).map(|f| f.1).unwrap_or(&SCHIP_BIG)
    }
}

pub fn small_font(name: &str) -> Result<(&'static str, &'static SmallFont), Chip8Error> {
    SMALL_FONTS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .copied()
        .ok_or_else(|| Chip8Error::UnknownFont(name.to_string()))
}

pub fn big_font(name: &str) -> Result<(&'static str, &'static BigFont), Chip8Error> {
    BIG_FONTS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .copied()
        .ok_or_else(|| Chip8Error::UnknownFont(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fonts_fit_below_program() {
        assert_eq!(BIG_FONT_ADDR, 0x050);
        assert!(BIG_FONT_ADDR as usize + SCHIP_BIG.len() <= 0x200);
    }

    #[test]
    fn test_parse_selection() {
        let f = FontSelection::parse("vip,schip").unwrap();
        assert_eq!(f.small, "vip");
        assert_eq!(f.big, "schip");
        let f = FontSelection::parse(",schip").unwrap();
        assert_eq!(f.small, "octo");
        let f = FontSelection::parse("VIP").unwrap();
        assert_eq!(f.small, "vip");
        assert_eq!(f.small_glyphs()[5], 0x60);
    }

    #[test]
    fn test_parse_unknown_font() {
        assert!(matches!(
            FontSelection::parse("comic,schip"),
            Err(Chip8Error::UnknownFont(name)) if name == "comic"
        ));
    }
}
