//! # mx-viz
//!
//! Visualization data artifacts for medexp.
//!
//! Artifacts are plain serde structs with arrays instead of nested objects so
//! they can be rendered by `mx-viz-render` or loaded by any plotting tool.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// Event-study coefficient plot artifact.
pub mod event_study;

/// Pre-period trends by expansion status.
pub mod pretrends;

pub use event_study::{EventStudyArtifact, EventStudyPoint, event_study_artifact};
pub use pretrends::{PretrendSeries, PretrendsArtifact, pretrends_artifact};

/// Provenance block shared by all artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Producing tool.
    pub tool: String,
    /// Producing tool version.
    pub tool_version: String,
}

impl Default for ArtifactMeta {
    fn default() -> Self {
        Self { tool: "medexp".into(), tool_version: mx_core::VERSION.into() }
    }
}
