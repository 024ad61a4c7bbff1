mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use claimsentry_core::{DetectionConfig, Engine, RunStatus};
use claimsentry_store::{
    DuckStore, ExportFormat, create_run_folder, read_feed, write_exports, write_summary,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "claimsentry")]
#[command(version, about = "Health-insurance claim fraud typology detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a claims snapshot, run every detector and write the exports
    Run(RunArgs),

    /// Page through the consolidated feed of a previous run
    Show {
        /// Run folder (run_YYYYMMDD_HHMMSS)
        run_dir: PathBuf,

        /// Page to display, 15 anomalies per page
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Directory holding <table>.parquet or <table>.csv for every raw table
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Persistent DuckDB file; in-memory when omitted
    #[arg(long)]
    db: Option<PathBuf>,

    /// JSON file with detection thresholds; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// First care date of the window; defaults to today minus the window length
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Window length in days
    #[arg(long, env = "ADMI_WINDOW_DAYS")]
    window_days: Option<u32>,

    /// T2 tolerance as a fraction of the tariff (0.10 = 10%)
    #[arg(long, env = "ADMI_T2_TOL_PCT")]
    t2_tolerance: Option<f64>,

    /// T3 minimum acts in 7 days
    #[arg(long, env = "ADMI_T3_MIN_ACTES_7J")]
    t3_min_acts: Option<usize>,

    /// T3 minimum positive-variance acts in 7 days
    #[arg(long, env = "ADMI_T3_MIN_ECARTS_7J")]
    t3_min_positive: Option<usize>,

    /// T4 minimum distinct structures per beneficiary and day
    #[arg(long, env = "ADMI_T4_MIN_STRUCTS_JOUR")]
    t4_min_structures: Option<usize>,

    /// Root folder for run outputs
    #[arg(long, env = "ADMI_OUT_DIR", default_value = "reports")]
    out_dir: PathBuf,

    /// Export format: csv or parquet
    #[arg(long, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,
}

impl RunArgs {
    fn detection_config(&self) -> anyhow::Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                DetectionConfig::from_json(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => DetectionConfig::default(),
        };
        if let Some(v) = self.window_days {
            config.window_days = v;
        }
        if let Some(v) = self.t2_tolerance {
            config.t2_tolerance_pct = v;
        }
        if let Some(v) = self.t3_min_acts {
            config.t3_min_acts_7d = v;
        }
        if let Some(v) = self.t3_min_positive {
            config.t3_min_positive_variance_7d = v;
        }
        if let Some(v) = self.t4_min_structures {
            config.t4_min_structures_per_day = v;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("claimsentry v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => cmd_run(&args),
        Commands::Show { run_dir, page } => cmd_show(&run_dir, page),
    }
}

fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.detection_config()?;
    let engine = Engine::new(config.clone()).context("invalid detection thresholds")?;

    let store = match &args.db {
        Some(path) => DuckStore::open_persistent(path)
            .with_context(|| format!("opening {}", path.display()))?,
        None => DuckStore::open()?,
    };
    match &args.data_dir {
        Some(dir) => store
            .load_all(dir)
            .with_context(|| format!("loading raw tables from {}", dir.display()))?,
        None if store.has_tables() => info!("using raw tables already in the database"),
        None => bail!("no --data-dir given and the database holds no claims tables"),
    }

    let started = Local::now().naive_local();
    let window_start = args
        .since
        .unwrap_or_else(|| config.window_start(started.date()));
    let raw = store
        .snapshot(window_start)
        .context("selecting the claims snapshot")?;
    let report = engine.run(&raw).context("running detectors")?;

    let run_dir = create_run_folder(&args.out_dir, started)?;
    write_exports(&run_dir, &report.exports, args.format)?;
    let summary = report.summary(&config, window_start, started);
    write_summary(&run_dir, &summary)?;

    if report.status == RunStatus::NoData {
        info!(window_start = %window_start, "no data in the window");
    }
    display::print_summary(&summary, &run_dir);
    Ok(())
}

fn cmd_show(run_dir: &Path, page: usize) -> anyhow::Result<()> {
    let batches =
        read_feed(run_dir).with_context(|| format!("reading feed from {}", run_dir.display()))?;
    display::print_page(&batches, page)
}
