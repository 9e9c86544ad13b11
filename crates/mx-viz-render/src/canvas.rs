use std::fmt::{self, Write as FmtWrite};

use crate::color::Color;
use crate::layout::margins::PlotArea;
use crate::primitives::{Align, Font, Marker, Stroke};
use crate::text::baseline_y;

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";

#[derive(Debug, Clone)]
enum Shape {
    Frame { x: f64, y: f64, w: f64, h: f64, fill: Option<Color>, edge: Option<Stroke> },
    Segment { x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke },
    Path { points: Vec<(f64, f64)>, stroke: Stroke },
    Whisker { x: f64, lo: f64, hi: f64, cap: f64, stroke: Stroke },
    Dot { x: f64, y: f64, marker: Marker },
    Label { x: f64, y: f64, text: String, font: Font, vertical: bool },
}

/// Deferred SVG canvas. Coordinates in points (1pt = 1/72").
///
/// Shapes keep the clip region that was active when they were drawn; runs of
/// shapes sharing a region are written inside one clipped `<g>`.
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    shapes: Vec<(Option<usize>, Shape)>,
    clips: Vec<PlotArea>,
    active_clip: Option<usize>,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> crate::Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(crate::RenderError::Layout(format!(
                "figure size must be positive, got {width} x {height}"
            )));
        }
        Ok(Self { width, height, shapes: Vec::new(), clips: Vec::new(), active_clip: None })
    }

    fn push(&mut self, shape: Shape) {
        self.shapes.push((self.active_clip, shape));
    }

    /// Axis-aligned rectangle with optional fill and edge.
    pub fn frame(&mut self, area: &PlotArea, fill: Option<Color>, edge: Option<Stroke>) {
        let (x, y, w, h) = (area.left, area.top, area.width, area.height);
        self.push(Shape::Frame { x, y, w, h, fill, edge });
    }

    pub fn segment(&mut self, from: (f64, f64), to: (f64, f64), stroke: Stroke) {
        self.push(Shape::Segment { x1: from.0, y1: from.1, x2: to.0, y2: to.1, stroke });
    }

    /// Open polyline through `points`; fewer than two points draw nothing.
    pub fn path(&mut self, points: &[(f64, f64)], stroke: Stroke) {
        if points.len() >= 2 {
            self.push(Shape::Path { points: points.to_vec(), stroke });
        }
    }

    /// Vertical interval from `lo` to `hi` at `x`, capped when `cap > 0`.
    pub fn whisker(&mut self, x: f64, lo: f64, hi: f64, cap: f64, stroke: Stroke) {
        self.push(Shape::Whisker { x, lo, hi, cap, stroke });
    }

    pub fn dot(&mut self, x: f64, y: f64, marker: Marker) {
        self.push(Shape::Dot { x, y, marker });
    }

    pub fn label(&mut self, x: f64, y: f64, text: &str, font: Font) {
        self.push(Shape::Label { x, y, text: text.to_string(), font, vertical: false });
    }

    /// Label reading bottom to top, anchored at `(x, y)`.
    pub fn vertical_label(&mut self, x: f64, y: f64, text: &str, font: Font) {
        self.push(Shape::Label { x, y, text: text.to_string(), font, vertical: true });
    }

    /// Run `draw` with output clipped to `area`.
    pub fn clipped(&mut self, area: &PlotArea, draw: impl FnOnce(&mut Self)) {
        let outer = self.active_clip.replace(self.clips.len());
        self.clips.push(*area);
        draw(self);
        self.active_clip = outer;
    }

    pub fn to_svg(&self) -> crate::Result<String> {
        let mut out = String::with_capacity(32 * 1024);
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        )?;

        if !self.clips.is_empty() {
            out.push_str("<defs>\n");
            for (id, a) in self.clips.iter().enumerate() {
                write!(out, r#"<clipPath id="clip{id}">"#)?;
                write!(out, r#"<rect x="{:.2}" y="{:.2}""#, a.left, a.top)?;
                writeln!(out, r#" width="{:.2}" height="{:.2}" /></clipPath>"#, a.width, a.height)?;
            }
            out.push_str("</defs>\n");
        }

        writeln!(out, r#"<rect width="{}" height="{}" fill="white" />"#, self.width, self.height)?;

        let mut open: Option<usize> = None;
        for (clip, shape) in &self.shapes {
            if *clip != open {
                if open.is_some() {
                    out.push_str("</g>\n");
                }
                if let Some(id) = clip {
                    writeln!(out, r#"<g clip-path="url(#clip{id})">"#)?;
                }
                open = *clip;
            }
            write_shape(&mut out, shape)?;
        }
        if open.is_some() {
            out.push_str("</g>\n");
        }

        out.push_str("</svg>\n");
        Ok(out)
    }
}

fn push_escaped(out: &mut String, content: &str) {
    for ch in content.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn write_stroke(out: &mut String, stroke: &Stroke) -> fmt::Result {
    write!(out, r#" stroke="{}" stroke-width="{:.2}""#, stroke.color, stroke.width)?;
    if let Some(pattern) = stroke.dash.pattern() {
        write!(out, r#" stroke-dasharray="{pattern}""#)?;
    }
    Ok(())
}

fn write_shape(out: &mut String, shape: &Shape) -> fmt::Result {
    match shape {
        Shape::Frame { x, y, w, h, fill, edge } => {
            write!(out, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#)?;
            match fill {
                Some(c) => write!(out, r#" fill="{c}""#)?,
                None => out.push_str(r#" fill="none""#),
            }
            if let Some(s) = edge {
                write_stroke(out, s)?;
            }
        }
        Shape::Segment { x1, y1, x2, y2, stroke } => {
            write!(out, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#)?;
            write_stroke(out, stroke)?;
        }
        Shape::Path { points, stroke } => {
            out.push_str(r#"<polyline points=""#);
            for (i, (x, y)) in points.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write!(out, "{x:.2},{y:.2}")?;
            }
            out.push_str(r#"" fill="none""#);
            write_stroke(out, stroke)?;
        }
        Shape::Whisker { x, lo, hi, cap, stroke } => {
            write!(out, r#"<path d="M{x:.2} {lo:.2}V{hi:.2}"#)?;
            if *cap > 0.0 {
                let (l, r) = (x - cap / 2.0, x + cap / 2.0);
                write!(out, "M{l:.2} {lo:.2}H{r:.2}M{l:.2} {hi:.2}H{r:.2}")?;
            }
            out.push_str(r#"" fill="none""#);
            write_stroke(out, stroke)?;
        }
        Shape::Dot { x, y, marker } => {
            write!(out, r#"<circle cx="{x:.2}" cy="{y:.2}" r="{:.2}""#, marker.radius)?;
            let (fill, width) =
                if marker.hollow { (Color::rgb(255, 255, 255), 1.0) } else { (marker.color, 0.5) };
            write!(out, r#" fill="{fill}" stroke="{}" stroke-width="{width:.2}""#, marker.color)?;
        }
        Shape::Label { x, y, text, font, vertical } => {
            // Vertical labels are rotated -90°, so their "down" is +x.
            let drop = baseline_y(0.0, font);
            let (x, y) = if *vertical { (x + drop, *y) } else { (*x, y + drop) };
            let anchor = match font.align {
                Align::Left => "start",
                Align::Center => "middle",
                Align::Right => "end",
            };
            write!(out, r#"<text x="{x:.2}" y="{y:.2}" font-family="{FONT_FAMILY}""#)?;
            write!(out, r#" font-size="{:.1}" fill="black" text-anchor="{anchor}""#, font.size)?;
            if font.bold {
                out.push_str(r#" font-weight="bold""#);
            }
            if *vertical {
                write!(out, r#" transform="rotate(-90,{x:.2},{y:.2})""#)?;
            }
            out.push('>');
            push_escaped(out, text);
            out.push_str("</text>\n");
            return Ok(());
        }
    }
    out.push_str(" />\n");
    Ok(())
}
