use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` (leading `#` optional); `None` if malformed.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let s = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Like [`parse_hex`](Self::parse_hex), falling back to black.
    pub fn hex(s: &str) -> Self {
        Self::parse_hex(s).unwrap_or_default()
    }

    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    pub fn to_svg_fill(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_svg_fill())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse_hex(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid color {s:?}, expected #rrggbb"))
        })
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

// --- Palettes ---

pub const TABLEAU10: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

pub const OKABE_ITO: &[&str] =
    &["#0072b2", "#d55e00", "#56b4e9", "#e69f00", "#f0e442", "#009e73", "#cc79a7"];

pub fn palette_colors(name: &str) -> Vec<Color> {
    let strs = match name {
        "okabe_ito" => OKABE_ITO,
        _ => TABLEAU10,
    };
    strs.iter().map(|s| Color::hex(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        let c = Color::hex("#1D4ED8");
        assert_eq!(c.r, 0x1D);
        assert_eq!(c.g, 0x4E);
        assert_eq!(c.b, 0xD8);
        assert!((c.a - 1.0).abs() < 1e-9);
        assert_eq!(Color::parse_hex("1d4ed8"), Some(c));
        assert_eq!(Color::parse_hex("#12345"), None);
        assert_eq!(Color::parse_hex("#zz0000"), None);
    }

    #[test]
    fn svg_fill() {
        assert_eq!(Color::rgb(29, 78, 216).to_svg_fill(), "#1d4ed8");
        assert_eq!(Color::rgb(29, 78, 216).with_alpha(0.5).to_svg_fill(), "rgba(29,78,216,0.500)");
    }

    #[test]
    fn palette_lookup() {
        assert_eq!(palette_colors("tableau10").len(), 10);
        assert_eq!(palette_colors("okabe_ito").len(), 7);
        assert_eq!(palette_colors("unknown").len(), 10);
    }
}
