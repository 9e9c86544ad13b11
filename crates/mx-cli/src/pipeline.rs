//! Panel and event-study stages shared by the subcommands and `medexp run`.

use anyhow::{Context, Result};
use mx_core::StateFips;
use mx_inference::econometrics::did::INTERACTION_COL;
use mx_inference::{EventWindow, RankPolicy, did_twfe, event_study_twfe};
use mx_panel::{FixedWidthLayout, MicrodataReader, POLICY_YEAR, PanelRow};
use mx_viz_render::config::VizConfig;
use std::path::PathBuf;

use crate::summary;
use crate::write_json;

/// Inputs and outputs of the panel stage.
#[derive(Debug, Clone)]
pub struct PanelStage {
    pub microdata: PathBuf,
    pub expansion_csv: PathBuf,
    pub panel_csv: PathBuf,
    pub pretrends_svg: Option<PathBuf>,
    pub pretrends_json: Option<PathBuf>,
    pub did_json: Option<PathBuf>,
    pub layout: FixedWidthLayout,
    pub chunk_size: usize,
    pub policy: RankPolicy,
}

/// Inputs and outputs of the event-study stage.
#[derive(Debug, Clone)]
pub struct EventStudyStage {
    pub panel_csv: PathBuf,
    pub svg: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub window: EventWindow,
    pub policy: RankPolicy,
}

/// Aggregate, merge, plot pre-trends, fit the DiD, then write the panel.
///
/// The panel CSV is written last so a failed fit leaves no partial output.
pub fn run_panel(stage: &PanelStage, viz: &VizConfig) -> Result<()> {
    tracing::info!(
        path = %stage.microdata.display(),
        chunk_size = stage.chunk_size,
        "reading microdata"
    );
    let mut reader = MicrodataReader::open(&stage.microdata, stage.layout.clone())
        .with_context(|| format!("failed to open microdata {}", stage.microdata.display()))?;
    let agg = mx_panel::aggregate_microdata(&mut reader, stage.chunk_size)
        .with_context(|| format!("failed to aggregate {}", stage.microdata.display()))?;
    if !agg.undefined.is_empty() {
        tracing::warn!(groups = agg.undefined.len(), "state-year groups with zero total weight");
    }

    let reference = mx_panel::expansion::read_expansion_csv_path(&stage.expansion_csv)
        .with_context(|| format!("failed to read {}", stage.expansion_csv.display()))?;
    let merged = mx_panel::merge_expansion(&agg.cells, &reference)?;

    if stage.pretrends_svg.is_some() || stage.pretrends_json.is_some() {
        let artifact = mx_viz::pretrends_artifact(&merged.rows, POLICY_YEAR)?;
        if let Some(path) = &stage.pretrends_json {
            write_json(path, serde_json::to_value(&artifact)?)?;
        }
        if let Some(path) = &stage.pretrends_svg {
            let svg = mx_viz_render::plots::pretrends::render(&artifact, viz)?;
            mx_viz_render::write_svg(&svg, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote pre-trends plot");
        }
    }

    let complete: Vec<&PanelRow> = merged.rows.iter().filter(|r| r.is_complete()).collect();
    let dropped = merged.rows.len() - complete.len();
    if dropped > 0 {
        tracing::warn!(
            dropped,
            kept = complete.len(),
            "rows with missing fields excluded from the DiD fit"
        );
    }
    let y: Vec<f64> = complete.iter().filter_map(|r| r.uninsured_rate).collect();
    let entity: Vec<StateFips> = complete.iter().map(|r| r.statefip).collect();
    let time: Vec<i32> = complete.iter().map(|r| r.year).collect();
    let treat: Vec<u8> = complete.iter().filter_map(|r| r.expansion).collect();
    let post: Vec<u8> = complete.iter().filter_map(|r| r.post).collect();

    let did = did_twfe(&y, &entity, &time, &treat, &post, stage.policy).context("DiD fit failed")?;
    tracing::info!(n_obs = did.n_obs, rank = did.fit.rank, "DiD fit complete");

    print!("{}", summary::format_fit("Two-way fixed-effects DiD (HC1)", "uninsured_rate", &did.fit));
    println!("{}", summary::did_headline(&did.term));
    if did.interaction_aliased() {
        println!("note: {INTERACTION_COL} is aliased; the estimate is the minimum-norm share");
    }

    if let Some(path) = &stage.did_json {
        let value = serde_json::json!({
            "term": did.term,
            "interaction_aliased": did.interaction_aliased(),
            "n_obs": did.n_obs,
            "n_entities": did.n_entities,
            "n_periods": did.n_periods,
            "rows_dropped": dropped,
            "unmatched_cells": merged.unmatched.len(),
            "fit": did.fit,
        });
        write_json(path, value)?;
    }

    mx_panel::panel::write_panel_csv_path(&stage.panel_csv, &merged.rows)
        .with_context(|| format!("failed to write {}", stage.panel_csv.display()))?;
    tracing::info!(path = %stage.panel_csv.display(), rows = merged.rows.len(), "wrote panel");
    Ok(())
}

/// Reload the panel, fit the event study, write its artifact and plot.
pub fn run_event_study(stage: &EventStudyStage, viz: &VizConfig) -> Result<()> {
    let rows = mx_panel::panel::read_panel_csv_path(&stage.panel_csv)
        .with_context(|| format!("failed to read panel {}", stage.panel_csv.display()))?;

    let usable: Vec<&PanelRow> = rows.iter().filter(|r| r.uninsured_rate.is_some()).collect();
    let dropped = rows.len() - usable.len();
    if dropped > 0 {
        tracing::warn!(
            dropped,
            kept = usable.len(),
            "rows with a missing rate excluded from the event study"
        );
    }
    let y: Vec<f64> = usable.iter().filter_map(|r| r.uninsured_rate).collect();
    let entity: Vec<StateFips> = usable.iter().map(|r| r.statefip).collect();
    let time: Vec<i32> = usable.iter().map(|r| r.year).collect();

    let result = event_study_twfe(&y, &entity, &time, stage.window, stage.policy)
        .context("event-study fit failed")?;
    tracing::info!(n_obs = result.fit.n_obs, rank = result.fit.rank, "event-study fit complete");

    print!("{}", summary::format_fit("Event study (HC1)", "uninsured_rate", &result.fit));

    let artifact = mx_viz::event_study_artifact(&result, dropped)?;
    if let Some(path) = &stage.json {
        write_json(path, serde_json::to_value(&artifact)?)?;
    }
    if let Some(path) = &stage.svg {
        let svg = mx_viz_render::plots::event_study::render(&artifact, viz)?;
        mx_viz_render::write_svg(&svg, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote event-study plot");
    }
    Ok(())
}
