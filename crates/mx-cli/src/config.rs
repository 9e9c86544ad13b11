//! `medexp run` pipeline configuration.

use anyhow::{Context, Result};
use mx_inference::{EventWindow, RankPolicy};
use mx_panel::FixedWidthLayout;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default number of person records decoded per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5_000_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Fixed-width person-level extract.
    pub microdata: PathBuf,
    /// Expansion reference table (generated unless `generate_expansion: false`).
    pub expansion_csv: PathBuf,
    /// State-year panel written by the panel stage and read by the event study.
    pub panel_csv: PathBuf,

    /// Regenerate `expansion_csv` from the built-in adoption schedule.
    #[serde(default = "default_true")]
    pub generate_expansion: bool,

    #[serde(default)]
    pub pretrends_svg: Option<PathBuf>,
    #[serde(default)]
    pub pretrends_json: Option<PathBuf>,
    #[serde(default)]
    pub event_study_svg: Option<PathBuf>,
    #[serde(default)]
    pub did_json: Option<PathBuf>,
    #[serde(default)]
    pub event_study_json: Option<PathBuf>,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Treat a rank-deficient design as an error instead of reporting
    /// minimum-norm estimates.
    #[serde(default)]
    pub strict_rank: bool,

    #[serde(default)]
    pub layout: FixedWidthLayout,
    #[serde(default)]
    pub event_window: EventWindow,

    /// YAML plot styling (see `mx-viz-render`).
    #[serde(default)]
    pub viz_config: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl RunConfig {
    pub fn rank_policy(&self) -> RankPolicy {
        rank_policy(self.strict_rank)
    }

    /// Resolve every relative path against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.microdata);
        join(&mut self.expansion_csv);
        join(&mut self.panel_csv);
        for p in [
            &mut self.pretrends_svg,
            &mut self.pretrends_json,
            &mut self.event_study_svg,
            &mut self.did_json,
            &mut self.event_study_json,
            &mut self.viz_config,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
        self
    }
}

pub fn rank_policy(strict: bool) -> RankPolicy {
    if strict { RankPolicy::Error } else { RankPolicy::MinimumNorm }
}

/// Read a YAML (default) or JSON (`.json`) config and resolve its relative
/// paths against the config file's directory.
pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid JSON config {}", path.display()))?
    } else {
        serde_yaml_ng::from_slice(&bytes)
            .with_context(|| format!("invalid YAML config {}", path.display()))?
    };
    if cfg.chunk_size == 0 {
        anyhow::bail!("chunk_size must be >= 1");
    }
    cfg.event_window.validate()?;

    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(cfg.resolve_paths(&base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_yaml(text: &str) -> RunConfig {
        serde_yaml_ng::from_str(text).unwrap()
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let cfg = parse_yaml(
            "microdata: usa_00001.dat\nexpansion_csv: expansion_status.csv\npanel_csv: panel.csv\n",
        );
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(cfg.generate_expansion);
        assert!(!cfg.strict_rank);
        assert_eq!(cfg.rank_policy(), RankPolicy::MinimumNorm);
        assert_eq!(cfg.layout, FixedWidthLayout::default());
        assert_eq!(cfg.event_window, EventWindow::default());
        assert!(cfg.pretrends_svg.is_none());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let cfg = parse_yaml(
            "microdata: data/usa.dat\nexpansion_csv: /abs/exp.csv\npanel_csv: panel.csv\nevent_study_svg: figs/es.svg\n",
        )
        .resolve_paths(Path::new("/work/study"));
        assert_eq!(cfg.microdata, PathBuf::from("/work/study/data/usa.dat"));
        assert_eq!(cfg.expansion_csv, PathBuf::from("/abs/exp.csv"));
        assert_eq!(cfg.panel_csv, PathBuf::from("/work/study/panel.csv"));
        assert_eq!(cfg.event_study_svg, Some(PathBuf::from("/work/study/figs/es.svg")));
    }

    #[test]
    fn nested_sections_and_unknown_keys() {
        let cfg = parse_yaml(
            "microdata: a\nexpansion_csv: b\npanel_csv: c\nstrict_rank: true\n\
             event_window:\n  max_offset: 5\n\
             layout:\n  weight_divisor: 1.0\n",
        );
        assert_eq!(cfg.rank_policy(), RankPolicy::Error);
        assert_eq!(cfg.event_window.max_offset, 5);
        assert_eq!(cfg.event_window.min_offset, -4);
        assert_eq!(cfg.layout.weight_divisor, 1.0);

        let bad: std::result::Result<RunConfig, _> =
            serde_yaml_ng::from_str("microdata: a\nexpansion_csv: b\npanel_csv: c\nchunksize: 3\n");
        assert!(bad.is_err());
    }
}
