use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::{TickDirection, VizConfig};
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::{Align, Dash, Font, Stroke, VAlign};

const INK: Color = Color::rgb(0, 0, 0);

/// Boxed axes: dotted grid, ticks on the bottom and left edges, tick labels,
/// and the x and rotated y axis labels.
pub fn draw_axes(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    config: &VizConfig,
) {
    let grid_color = config.grid.color.with_alpha(config.grid.alpha);
    let grid = config.grid.show.then(|| Stroke::new(grid_color, 0.5).dash(Dash::Dotted));
    // Offset of the tick's inner end from the frame, signed toward the data.
    let reach = match config.axes.tick_direction {
        TickDirection::In => config.axes.tick_length,
        TickDirection::Out => -config.axes.tick_length,
    };
    let tick = Stroke::new(INK, 0.6);
    let tick_font = Font::new(config.font.tick_size);

    let x_label_top = area.x_tick_label_top(config);
    for (val, label) in ticks(x_axis) {
        let px = area.x(x_axis, val);
        if !(area.left - 0.5..=area.right() + 0.5).contains(&px) {
            continue;
        }
        if let Some(g) = grid {
            canvas.segment((px, area.top), (px, area.bottom()), g);
        }
        canvas.segment((px, area.bottom()), (px, area.bottom() - reach), tick);
        canvas.label(px, x_label_top, label, tick_font.at(Align::Center, VAlign::Top));
    }

    let y_label_right = area.y_tick_label_right(config);
    for (val, label) in ticks(y_axis) {
        let py = area.y(y_axis, val);
        if !(area.top - 0.5..=area.bottom() + 0.5).contains(&py) {
            continue;
        }
        if let Some(g) = grid {
            canvas.segment((area.left, py), (area.right(), py), g);
        }
        canvas.segment((area.left, py), (area.left + reach, py), tick);
        canvas.label(y_label_right, py, label, tick_font.at(Align::Right, VAlign::Middle));
    }

    canvas.frame(area, None, Some(Stroke::new(INK, 0.8)));

    let label_font = Font::new(config.font.label_size);
    if !x_axis.label.is_empty() {
        let font = label_font.at(Align::Center, VAlign::Top);
        canvas.label(area.center_x(), area.x_label_top(config), &x_axis.label, font);
    }
    if !y_axis.label.is_empty() {
        let x = area.y_label_baseline(y_axis, config);
        let y_mid = area.top + area.height / 2.0;
        let font = label_font.at(Align::Center, VAlign::Baseline);
        canvas.vertical_label(x, y_mid, &y_axis.label, font);
    }
}

fn ticks(axis: &Axis) -> impl Iterator<Item = (f64, &str)> {
    axis.tick_positions.iter().copied().zip(axis.tick_labels.iter().map(String::as_str))
}
