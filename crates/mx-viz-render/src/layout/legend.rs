use crate::canvas::Canvas;
use crate::color::Color;
use crate::layout::margins::PlotArea;
use crate::primitives::{Align, Font, Marker, Stroke, VAlign};
use crate::text::measure;

const SWATCH: f64 = 16.0;
const GAP: f64 = 6.0;
const PADDING: f64 = 6.0;

pub struct LegendEntry {
    pub label: String,
    pub marker: Marker,
    /// Line drawn through the marker, for line series.
    pub line: Option<Stroke>,
}

/// Framed legend in the top-right corner of the plot area.
pub fn draw_legend(canvas: &mut Canvas, area: &PlotArea, entries: &[LegendEntry], font_size: f64) {
    if entries.is_empty() {
        return;
    }

    let font = Font::new(font_size * 0.9).at(Align::Left, VAlign::Middle);
    let row_height = font_size + 4.0;
    let label_w = entries.iter().map(|e| measure(&e.label, &font).width).fold(0.0_f64, f64::max);

    let width = PADDING + SWATCH + GAP + label_w + PADDING;
    let height = 2.0 * PADDING + entries.len() as f64 * row_height;
    let frame = PlotArea { left: area.right() - width - 5.0, top: area.top + 5.0, width, height };
    canvas.frame(
        &frame,
        Some(Color::rgba(255, 255, 255, 0.9)),
        Some(Stroke::new(Color::rgb(200, 200, 200), 0.5)),
    );

    let sx = frame.left + PADDING;
    for (i, entry) in entries.iter().enumerate() {
        let ey = frame.top + PADDING + (i as f64 + 0.5) * row_height;
        if let Some(line) = entry.line {
            canvas.segment((sx, ey), (sx + SWATCH, ey), line);
        }
        canvas.dot(sx + SWATCH / 2.0, ey, entry.marker);
        canvas.label(sx + SWATCH + GAP, ey, &entry.label, font);
    }
}
