use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::{Align, Font, VAlign};

/// Bold title centered over the plot area.
pub fn draw_title(canvas: &mut Canvas, area: &PlotArea, title: &str, config: &VizConfig) {
    if !title.is_empty() {
        let font = Font::new(config.font.title_size).bold().at(Align::Center, VAlign::Baseline);
        canvas.label(area.center_x(), area.top - 10.0, title, font);
    }
}
