use std::fmt;
use std::str::FromStr;

/// Linear RGB color as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Unpack from `0xRRGGBB`; the top byte is ignored.
    pub const fn from_rgb24(value: u32) -> Self {
        Color {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        }
    }

    /// Pack into `0xRRGGBB`.
    pub const fn to_rgb24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Channels in the order the strip shifts them in (green, red, blue).
    pub const fn to_grb(self) -> [u8; 3] {
        [self.g, self.r, self.b]
    }

    /// Largest of the three channels.
    pub fn max_channel(self) -> u8 {
        self.r.max(self.g).max(self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R={:03} G={:03} B={:03}", self.r, self.g, self.b)
    }
}

/// Parses `RRGGBB`, optionally prefixed with `#` or `0x`.
impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected 6 hex digits, got {:?}", s));
        }
        u32::from_str_radix(hex, 16)
            .map(Color::from_rgb24)
            .map_err(|e| format!("invalid color {:?}: {}", s, e))
    }
}
