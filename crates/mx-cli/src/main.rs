//! medexp CLI

mod config;
mod pipeline;
mod summary;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mx_inference::EventWindow;
use mx_panel::{ExpansionSchedule, FixedWidthLayout};
use mx_viz_render::config::VizConfig;
use std::path::{Path, PathBuf};

use pipeline::{EventStudyStage, PanelStage};

#[derive(Parser)]
#[command(name = "medexp")]
#[command(about = "medexp - Medicaid expansion and uninsured rates: panel, DiD and event study")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the state-year Medicaid expansion reference table (CSV)
    ExpansionStatus {
        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Aggregate microdata, merge expansion status, fit the DiD, write the panel
    Panel {
        /// Fixed-width person-level extract
        #[arg(long)]
        microdata: PathBuf,

        /// Expansion reference CSV
        #[arg(long)]
        expansion: PathBuf,

        /// Output panel CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Pre-trends plot (SVG)
        #[arg(long)]
        pretrends_svg: Option<PathBuf>,

        /// Pre-trends artifact (pretty JSON)
        #[arg(long)]
        pretrends_json: Option<PathBuf>,

        /// DiD result (pretty JSON)
        #[arg(long)]
        did_json: Option<PathBuf>,

        /// Person records decoded per chunk
        #[arg(long, default_value_t = config::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Fail on a rank-deficient design instead of reporting minimum-norm estimates
        #[arg(long)]
        strict_rank: bool,

        /// Plot styling (YAML)
        #[arg(long)]
        viz_config: Option<PathBuf>,
    },

    /// Fit the event study on a panel CSV
    EventStudy {
        /// Panel CSV written by `panel`
        #[arg(long)]
        panel: PathBuf,

        /// Event-study plot (SVG)
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Event-study artifact (pretty JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Calendar year of event time 0
        #[arg(long, default_value = "2014", allow_hyphen_values = true)]
        base_year: i32,

        /// First event-time offset
        #[arg(long, default_value = "-4", allow_hyphen_values = true)]
        min_offset: i32,

        /// Last event-time offset
        #[arg(long, default_value = "9", allow_hyphen_values = true)]
        max_offset: i32,

        /// Fail on a rank-deficient design instead of reporting minimum-norm estimates
        #[arg(long)]
        strict_rank: bool,

        /// Plot styling (YAML)
        #[arg(long)]
        viz_config: Option<PathBuf>,
    },

    /// Render a pre-trends or event-study artifact JSON to SVG
    Render {
        /// Artifact JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Artifact kind (pretrends, event_study)
        #[arg(long)]
        kind: String,

        /// Output SVG path
        #[arg(short, long)]
        output: PathBuf,

        /// Plot styling (YAML)
        #[arg(long)]
        viz_config: Option<PathBuf>,
    },

    /// Run expansion-status, panel and event-study from one config file
    Run {
        /// Pipeline config (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::ExpansionStatus { output } => cmd_expansion_status(&output),
        Commands::Panel {
            microdata,
            expansion,
            output,
            pretrends_svg,
            pretrends_json,
            did_json,
            chunk_size,
            strict_rank,
            viz_config,
        } => {
            let viz = load_viz_config(viz_config.as_deref())?;
            let stage = PanelStage {
                microdata,
                expansion_csv: expansion,
                panel_csv: output,
                pretrends_svg,
                pretrends_json,
                did_json,
                layout: FixedWidthLayout::default(),
                chunk_size,
                policy: config::rank_policy(strict_rank),
            };
            pipeline::run_panel(&stage, &viz)
        }
        Commands::EventStudy {
            panel,
            svg,
            output,
            base_year,
            min_offset,
            max_offset,
            strict_rank,
            viz_config,
        } => {
            let viz = load_viz_config(viz_config.as_deref())?;
            let stage = EventStudyStage {
                panel_csv: panel,
                svg,
                json: output,
                window: EventWindow::new(base_year, min_offset, max_offset)?,
                policy: config::rank_policy(strict_rank),
            };
            pipeline::run_event_study(&stage, &viz)
        }
        Commands::Render { input, kind, output, viz_config } => {
            cmd_render(&input, &kind, &output, viz_config.as_deref())
        }
        Commands::Run { config } => cmd_run(&config),
        Commands::Version => {
            println!("medexp {}", mx_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_expansion_status(output: &Path) -> Result<()> {
    let schedule = ExpansionSchedule::aca()?;
    let rows = schedule.rows();
    mx_panel::expansion::write_expansion_csv_path(output, &rows)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), rows = rows.len(), "wrote expansion table");
    println!("wrote {} rows to {}", rows.len(), output.display());
    Ok(())
}

fn cmd_render(input: &Path, kind: &str, output: &Path, viz_config: Option<&Path>) -> Result<()> {
    let viz = load_viz_config(viz_config)?;
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    mx_viz_render::render_to_file(&json, kind, output, &viz)
        .with_context(|| format!("failed to render {} as {kind}", input.display()))?;
    tracing::info!(path = %output.display(), kind, "rendered artifact");
    Ok(())
}

fn cmd_run(config_path: &Path) -> Result<()> {
    let cfg = config::read_run_config(config_path)?;
    let viz = load_viz_config(cfg.viz_config.as_deref())?;
    let policy = cfg.rank_policy();

    if cfg.generate_expansion {
        cmd_expansion_status(&cfg.expansion_csv)?;
    }

    let panel = PanelStage {
        microdata: cfg.microdata.clone(),
        expansion_csv: cfg.expansion_csv.clone(),
        panel_csv: cfg.panel_csv.clone(),
        pretrends_svg: cfg.pretrends_svg.clone(),
        pretrends_json: cfg.pretrends_json.clone(),
        did_json: cfg.did_json.clone(),
        layout: cfg.layout.clone(),
        chunk_size: cfg.chunk_size,
        policy,
    };
    pipeline::run_panel(&panel, &viz)?;

    let event_study = EventStudyStage {
        panel_csv: cfg.panel_csv,
        svg: cfg.event_study_svg,
        json: cfg.event_study_json,
        window: cfg.event_window,
        policy,
    };
    pipeline::run_event_study(&event_study, &viz)
}

fn load_viz_config(path: Option<&Path>) -> Result<VizConfig> {
    match path {
        Some(p) => mx_viz_render::config::load_config(p)
            .with_context(|| format!("failed to load viz config {}", p.display())),
        None => Ok(VizConfig::default()),
    }
}

fn write_json(path: &Path, value: serde_json::Value) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote JSON");
    Ok(())
}
