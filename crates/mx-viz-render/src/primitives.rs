//! Paint descriptions used by the pre-trends and event-study charts.

use crate::color::Color;

/// Dash pattern of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dash {
    #[default]
    Solid,
    /// Reference lines (the zero line).
    Dashed,
    /// Grid lines.
    Dotted,
}

impl Dash {
    pub(crate) fn pattern(self) -> Option<&'static str> {
        match self {
            Dash::Solid => None,
            Dash::Dashed => Some("6 3"),
            Dash::Dotted => Some("3 3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub dash: Dash,
}

impl Stroke {
    pub const fn new(color: Color, width: f64) -> Self {
        Self { color, width, dash: Dash::Solid }
    }

    pub const fn dash(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }
}

/// Circle marker. Hollow markers are filled white so they cover grid lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub color: Color,
    pub radius: f64,
    pub hollow: bool,
}

impl Marker {
    pub const fn solid(color: Color, radius: f64) -> Self {
        Self { color, radius, hollow: false }
    }

    pub const fn hollow(color: Color, radius: f64) -> Self {
        Self { color, radius, hollow: true }
    }
}

/// Horizontal position of a label relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Which part of the label sits on the anchor's y coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Baseline,
    Middle,
    Top,
}

/// Label font. Labels are always black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub size: f64,
    pub bold: bool,
    pub align: Align,
    pub valign: VAlign,
}

impl Font {
    pub const fn new(size: f64) -> Self {
        Self { size, bold: false, align: Align::Left, valign: VAlign::Baseline }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn at(mut self, align: Align, valign: VAlign) -> Self {
        self.align = align;
        self.valign = valign;
        self
    }
}
