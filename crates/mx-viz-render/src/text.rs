//! Approximate text metrics.
//!
//! Output SVG names a generic sans-serif family and leaves glyph layout to
//! the viewer, so widths here are estimates from per-character advance
//! classes (em fractions typical of Helvetica/Arial). They drive margin and
//! legend sizing and the vertical placement of labels.

use crate::primitives::{Font, VAlign};

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    /// Baseline to cap height.
    pub ascent: f64,
}

fn advance_em(ch: char) -> f64 {
    match ch {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.28,
        'f' | 't' | 'r' | 'I' | ' ' | '(' | ')' | '[' | ']' | '-' => 0.33,
        'm' | 'w' | 'M' | 'W' => 0.83,
        '0'..='9' => 0.556,
        c if c.is_ascii_uppercase() => 0.67,
        c if c.is_ascii() => 0.5,
        _ => 0.6,
    }
}

/// Estimate the rendered extent of `text` at `size_pt`.
pub fn measure_text(text: &str, size_pt: f64, bold: bool) -> TextMetrics {
    let em: f64 = text.chars().map(advance_em).sum();
    let widen = if bold { 1.07 } else { 1.0 };
    TextMetrics { width: em * size_pt * widen, ascent: 0.72 * size_pt }
}

/// [`measure_text`] for a [`Font`].
pub fn measure(text: &str, font: &Font) -> TextMetrics {
    measure_text(text, font.size, font.bold)
}

/// Baseline y for a label whose `font.valign` part should sit at `y`.
pub fn baseline_y(y: f64, font: &Font) -> f64 {
    let ascent = measure_text("", font.size, font.bold).ascent;
    match font.valign {
        VAlign::Baseline => y,
        VAlign::Middle => y + ascent / 2.0,
        VAlign::Top => y + ascent,
    }
}
