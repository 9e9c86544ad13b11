//! # mx-viz-render
//!
//! SVG renderer for the `mx-viz` artifacts. Plots are drawn onto a deferred
//! [`canvas::Canvas`] and serialized to a standalone SVG document.

pub mod canvas;
pub mod color;
pub mod config;
pub mod layout;
pub mod plots;
pub mod primitives;
pub mod text;
pub mod title;

use config::VizConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown artifact kind: {0}")]
    UnknownKind(String),
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("formatting error: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render an artifact JSON to an SVG string.
pub fn render_svg(artifact_json: &str, kind: &str, config: &VizConfig) -> Result<String> {
    let svg = match kind {
        "pretrends" => {
            let art: mx_viz::PretrendsArtifact = serde_json::from_str(artifact_json)?;
            plots::pretrends::render(&art, config)?
        }
        "event_study" | "event-study" => {
            let art: mx_viz::EventStudyArtifact = serde_json::from_str(artifact_json)?;
            plots::event_study::render(&art, config)?
        }
        other => return Err(RenderError::UnknownKind(other.to_string())),
    };
    Ok(svg)
}

/// Write an already rendered SVG to `path`.
pub fn write_svg(svg: &str, path: &std::path::Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()).is_some_and(|e| !e.eq_ignore_ascii_case("svg")) {
        return Err(RenderError::UnknownKind(format!("format: {}", path.display())));
    }
    std::fs::write(path, svg)?;
    Ok(())
}

/// Render an artifact JSON to an SVG file.
pub fn render_to_file(
    artifact_json: &str,
    kind: &str,
    path: &std::path::Path,
    config: &VizConfig,
) -> Result<()> {
    let svg = render_svg(artifact_json, kind, config)?;
    write_svg(&svg, path)
}
