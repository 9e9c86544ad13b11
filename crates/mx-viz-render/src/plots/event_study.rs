use mx_viz::EventStudyArtifact;

use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::legend::{LegendEntry, draw_legend};
use crate::layout::margins::PlotArea;
use crate::plots::axes_draw::draw_axes;
use crate::primitives::{Dash, Marker, Stroke};
use crate::title::draw_title;

/// Point estimates with 95 % CI whiskers per offset and a dashed zero line.
pub fn render(artifact: &EventStudyArtifact, config: &VizConfig) -> crate::Result<String> {
    let cfg = &config.event_study;
    let (Some(first), Some(last)) = (artifact.points.first(), artifact.points.last()) else {
        return Err(crate::RenderError::Layout("event-study artifact has no points".into()));
    };

    let drawn: Vec<_> =
        artifact.points.iter().filter(|p| p.observed || cfg.show_unobserved).collect();
    // The zero line is always in range.
    let (y_min, y_max) = drawn
        .iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.ci_lower), hi.max(p.ci_upper)));
    if !(y_min.is_finite() && y_max.is_finite()) {
        return Err(crate::RenderError::Layout("event-study artifact has non-finite bounds".into()));
    }

    let mut canvas = Canvas::new(config.figure.width, config.figure.height)?;
    let x_axis = Axis::integer(first.offset, last.offset).with_label(cfg.x_label.as_str());
    let y_axis = Axis::auto_linear(y_min, y_max, 6).with_label(cfg.y_label.as_str());

    let has_title = !cfg.title.is_empty();
    let area = PlotArea::fit(canvas.width, canvas.height, &x_axis, &y_axis, has_title, config);
    draw_title(&mut canvas, &area, &cfg.title, config);
    draw_axes(&mut canvas, &area, &x_axis, &y_axis, config);

    let estimate = Marker::solid(config.colors.estimate, cfg.marker_size);
    let unobserved = Marker::hollow(config.colors.unobserved, cfg.marker_size);
    let whisker = Stroke::new(config.colors.estimate, 1.0);

    canvas.clipped(&area, |canvas| {
        let zero = area.y(&y_axis, 0.0);
        let zero_line = Stroke::new(config.colors.zero_line, 1.0).dash(Dash::Dashed);
        canvas.segment((area.left, zero), (area.right(), zero), zero_line);

        for p in &drawn {
            let px = area.x(&x_axis, f64::from(p.offset));
            let py = area.y(&y_axis, p.coef);
            if p.observed {
                let (lo, hi) = (area.y(&y_axis, p.ci_lower), area.y(&y_axis, p.ci_upper));
                canvas.whisker(px, lo, hi, cfg.cap_width, whisker);
                canvas.dot(px, py, estimate);
            } else {
                canvas.dot(px, py, unobserved);
            }
        }
    });

    if drawn.iter().any(|p| !p.observed) {
        let legend = [
            LegendEntry { label: "estimate (95% CI)".into(), marker: estimate, line: None },
            LegendEntry { label: "no observations".into(), marker: unobserved, line: None },
        ];
        draw_legend(&mut canvas, &area, &legend, config.font.size);
    }

    canvas.to_svg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_config;
    use mx_viz::{ArtifactMeta, EventStudyPoint};

    fn point(offset: i32, coef: f64, half: f64, observed: bool) -> EventStudyPoint {
        EventStudyPoint {
            offset,
            term: if offset < 0 {
                format!("D_m{}", -offset)
            } else if offset == 0 {
                "D_0".into()
            } else {
                format!("D_p{offset}")
            },
            coef,
            std_error: half / 1.96,
            ci_lower: coef - half,
            ci_upper: coef + half,
            p_value: None,
            observed,
            aliased: true,
        }
    }

    fn artifact(observed_through: i32) -> EventStudyArtifact {
        let points: Vec<EventStudyPoint> = (-4..=9)
            .map(|k| {
                if k <= observed_through {
                    point(k, if k >= 0 { -0.02 } else { 0.001 }, 0.005, true)
                } else {
                    point(k, 0.0, 0.0, false)
                }
            })
            .collect();
        EventStudyArtifact {
            schema_version: "medexp_event_study_v0".into(),
            meta: ArtifactMeta::default(),
            base_year: 2014,
            offsets: points.iter().map(|p| p.offset).collect(),
            coef: points.iter().map(|p| p.coef).collect(),
            ci_lower: points.iter().map(|p| p.ci_lower).collect(),
            ci_upper: points.iter().map(|p| p.ci_upper).collect(),
            points,
            n_obs: 714,
            rows_dropped: 0,
            rank: 64,
            aliased_terms: vec![],
        }
    }

    #[test]
    fn renders_error_bars_and_zero_line() {
        let svg = render(&artifact(9), &VizConfig::default()).unwrap();
        assert_eq!(svg.matches("<circle").count(), 14);
        assert_eq!(svg.matches("<path d=").count(), 14);
        assert_eq!(svg.matches(r#"stroke-dasharray="6 3""#).count(), 1);
        assert!(svg.contains("Years since expansion (2014 = 0)"));
        assert!(svg.contains("Change in uninsured rate"));
        assert!(svg.contains("Event-Study: Dynamic Effects of Medicaid Expansion"));
        assert!(svg.contains(">-4</text>"));
        assert!(svg.contains(">9</text>"));
        assert!(!svg.contains("no observations"));
    }

    #[test]
    fn unobserved_offsets_are_hidden_by_default() {
        let svg = render(&artifact(5), &VizConfig::default()).unwrap();
        assert_eq!(svg.matches("<circle").count(), 10);

        let config = resolve_config(Some("event_study:\n  show_unobserved: true\n")).unwrap();
        let svg = render(&artifact(5), &config).unwrap();
        // 14 points + 2 legend markers.
        assert_eq!(svg.matches("<circle").count(), 16);
        assert!(svg.contains("no observations"));
    }

    #[test]
    fn empty_artifact_is_an_error() {
        let mut art = artifact(9);
        art.points.clear();
        assert!(render(&art, &VizConfig::default()).is_err());
    }
}
