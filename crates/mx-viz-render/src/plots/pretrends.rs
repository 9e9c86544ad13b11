use mx_viz::PretrendsArtifact;

use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::legend::{LegendEntry, draw_legend};
use crate::layout::margins::PlotArea;
use crate::plots::axes_draw::draw_axes;
use crate::primitives::{Marker, Stroke};
use crate::title::draw_title;

/// Line chart with markers: one line per expansion flag, years on x.
pub fn render(artifact: &PretrendsArtifact, config: &VizConfig) -> crate::Result<String> {
    let years = artifact.series.iter().flat_map(|s| s.years.iter().copied());
    let (Some(first), Some(last)) = (years.clone().min(), years.max()) else {
        return Err(crate::RenderError::Layout("pre-trends artifact has no points".into()));
    };

    let rates = artifact.series.iter().flat_map(|s| s.mean_rate.iter().copied());
    let y_min = rates.clone().fold(f64::INFINITY, f64::min);
    let y_max = rates.fold(f64::NEG_INFINITY, f64::max);
    if !(y_min.is_finite() && y_max.is_finite()) {
        return Err(crate::RenderError::Layout("pre-trends artifact has non-finite rates".into()));
    }

    let cfg = &config.pretrends;
    let mut canvas = Canvas::new(config.figure.width, config.figure.height)?;
    let x_axis = Axis::integer(first, last).with_label(cfg.x_label.as_str());
    let y_axis = Axis::auto_linear(y_min, y_max, 5).with_label(cfg.y_label.as_str());

    let has_title = !cfg.title.is_empty();
    let area = PlotArea::fit(canvas.width, canvas.height, &x_axis, &y_axis, has_title, config);
    draw_title(&mut canvas, &area, &cfg.title, config);
    draw_axes(&mut canvas, &area, &x_axis, &y_axis, config);

    let palette = config.palette_colors();
    let legend: Vec<LegendEntry> = artifact
        .series
        .iter()
        .enumerate()
        .map(|(i, series)| {
            let color = palette[i % palette.len()];
            LegendEntry {
                label: series.label.clone(),
                marker: Marker::solid(color, cfg.marker_size),
                line: Some(Stroke::new(color, cfg.line_width)),
            }
        })
        .collect();

    canvas.clipped(&area, |canvas| {
        for (series, entry) in artifact.series.iter().zip(&legend) {
            let points: Vec<(f64, f64)> = series
                .years
                .iter()
                .zip(&series.mean_rate)
                .map(|(&year, &rate)| (area.x(&x_axis, f64::from(year)), area.y(&y_axis, rate)))
                .collect();
            if let Some(line) = entry.line {
                canvas.path(&points, line);
            }
            for &(px, py) in &points {
                canvas.dot(px, py, entry.marker);
            }
        }
    });

    draw_legend(&mut canvas, &area, &legend, config.font.size);
    canvas.to_svg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx_viz::{ArtifactMeta, PretrendSeries};

    fn artifact() -> PretrendsArtifact {
        PretrendsArtifact {
            schema_version: "medexp_pretrends_v0".into(),
            meta: ArtifactMeta::default(),
            cutoff_year: 2014,
            series: vec![
                PretrendSeries {
                    expansion: 0,
                    label: "expansion = 0".into(),
                    years: vec![2010, 2011, 2012, 2013],
                    mean_rate: vec![0.16, 0.158, 0.155, 0.151],
                    n_states: vec![51, 51, 51, 51],
                },
                PretrendSeries {
                    expansion: 1,
                    label: "expansion = 1".into(),
                    years: vec![2012, 2013],
                    mean_rate: vec![0.14, 0.13],
                    n_states: vec![3, 3],
                },
            ],
            rows_used: 210,
            rows_skipped: 0,
        }
    }

    #[test]
    fn renders_one_line_per_series() {
        let svg = render(&artifact(), &VizConfig::default()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        // 6 data markers + 2 legend markers.
        assert_eq!(svg.matches("<circle").count(), 8);
        assert!(svg.contains("Pre-expansion trends by expansion status"));
        assert!(svg.contains("Avg uninsured rate"));
        assert!(svg.contains("expansion = 1"));
        assert!(svg.contains(">2010</text>"));
        assert!(svg.contains(">2013</text>"));
    }

    #[test]
    fn single_point_series_still_renders() {
        let mut art = artifact();
        art.series.truncate(1);
        art.series[0].years = vec![2013];
        art.series[0].mean_rate = vec![0.2];
        let svg = render(&art, &VizConfig::default()).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 0);
        assert_eq!(svg.matches("<circle").count(), 2);
    }

    #[test]
    fn empty_artifact_is_an_error() {
        let mut art = artifact();
        art.series.clear();
        assert!(render(&art, &VizConfig::default()).is_err());
    }
}
