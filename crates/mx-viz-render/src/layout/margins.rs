use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::primitives::Font;
use crate::text::measure;

/// Canvas edge to the outermost label.
const GUTTER: f64 = 10.0;
/// Between a tick and its label, and between tick labels and the axis label.
const LABEL_GAP: f64 = 5.0;
const RIGHT_MARGIN: f64 = 15.0;
const MIN_SIDE: f64 = 50.0;

/// Rectangular plot area within the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    /// Pixel column of data value `v` on `axis`.
    pub fn x(&self, axis: &Axis, v: f64) -> f64 {
        axis.data_to_pixel(v, self.left, self.right())
    }

    /// Pixel row of data value `v` on `axis`; larger values sit higher.
    pub fn y(&self, axis: &Axis, v: f64) -> f64 {
        axis.data_to_pixel(v, self.bottom(), self.top)
    }

    /// Place the plot area so the title, tick labels and axis labels fit on
    /// a `width` x `height` canvas.
    pub fn fit(
        width: f64,
        height: f64,
        x_axis: &Axis,
        y_axis: &Axis,
        has_title: bool,
        config: &VizConfig,
    ) -> Self {
        let outset = config.axes.tick_outset();
        let fonts = &config.font;

        let mut left = GUTTER + y_tick_label_width(y_axis, config) + LABEL_GAP + outset;
        if !y_axis.label.is_empty() {
            left += fonts.label_size + LABEL_GAP;
        }

        let mut bottom = GUTTER + outset + LABEL_GAP + line_height(fonts.tick_size);
        if !x_axis.label.is_empty() {
            bottom += line_height(fonts.label_size) + LABEL_GAP;
        }

        let top = if has_title { line_height(fonts.title_size) + 2.0 * GUTTER } else { GUTTER };

        Self {
            left,
            top,
            width: (width - left - RIGHT_MARGIN).max(MIN_SIDE),
            height: (height - top - bottom).max(MIN_SIDE),
        }
    }

    /// Top of the x tick labels.
    pub(crate) fn x_tick_label_top(&self, config: &VizConfig) -> f64 {
        self.bottom() + config.axes.tick_outset() + LABEL_GAP
    }

    /// Top of the x axis label.
    pub(crate) fn x_label_top(&self, config: &VizConfig) -> f64 {
        self.x_tick_label_top(config) + line_height(config.font.tick_size) + LABEL_GAP
    }

    /// Right edge of the y tick labels.
    pub(crate) fn y_tick_label_right(&self, config: &VizConfig) -> f64 {
        self.left - config.axes.tick_outset() - LABEL_GAP
    }

    /// Baseline column of the rotated y axis label.
    pub(crate) fn y_label_baseline(&self, y_axis: &Axis, config: &VizConfig) -> f64 {
        self.y_tick_label_right(config) - y_tick_label_width(y_axis, config) - LABEL_GAP
    }
}

fn line_height(size: f64) -> f64 {
    1.15 * size
}

fn y_tick_label_width(y_axis: &Axis, config: &VizConfig) -> f64 {
    let font = Font::new(config.font.tick_size);
    y_axis.tick_labels.iter().map(|l| measure(l, &font).width).fold(0.0_f64, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_config;

    #[test]
    fn labels_and_title_shrink_the_area() {
        let config = VizConfig::default();
        let bare_x = Axis::integer(2010, 2013);
        let bare_y = Axis::auto_linear(0.1, 0.2, 5);
        let bare = PlotArea::fit(576.0, 360.0, &bare_x, &bare_y, false, &config);
        let labelled = PlotArea::fit(
            576.0,
            360.0,
            &bare_x.clone().with_label("year"),
            &bare_y.clone().with_label("rate"),
            true,
            &config,
        );
        assert!(labelled.left > bare.left);
        assert!(labelled.top > bare.top);
        assert!(labelled.bottom() < bare.bottom());
        assert_eq!(bare.right(), labelled.right());
        assert_eq!(bare.right(), 576.0 - RIGHT_MARGIN);
    }

    #[test]
    fn inward_ticks_pull_labels_to_the_frame() {
        let x = Axis::integer(-4, 9);
        let y = Axis::auto_linear(-0.05, 0.01, 6).with_label("effect");
        let out = VizConfig::default();
        let inward = resolve_config(Some("axes:\n  tick_direction: in\n")).unwrap();
        let a_out = PlotArea::fit(576.0, 360.0, &x, &y, false, &out);
        let a_in = PlotArea::fit(576.0, 360.0, &x, &y, false, &inward);
        assert!((a_out.left - a_in.left - out.axes.tick_length).abs() < 1e-9);
        assert_eq!(a_in.y_tick_label_right(&inward), a_in.left - LABEL_GAP);
        assert!(a_in.y_label_baseline(&y, &inward) > GUTTER);
    }

    #[test]
    fn tiny_canvas_keeps_minimum_area() {
        let x = Axis::integer(0, 1).with_label("x");
        let y = Axis::auto_linear(0.0, 1.0, 5).with_label("y");
        let a = PlotArea::fit(60.0, 40.0, &x, &y, true, &VizConfig::default());
        assert_eq!(a.width, MIN_SIDE);
        assert_eq!(a.height, MIN_SIDE);
    }
}
