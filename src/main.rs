//! CLI entry point for the rainfall trend pipeline.
//!
//! Provides one subcommand per stage (inspect, clean, aggregate, trend-test,
//! visualize) and `run-all`, which runs them in order and stops at the first
//! failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rainfall_trends::config::PipelineConfig;
use rainfall_trends::pipeline::{self, DEFAULT_INSPECT_ROWS};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rainfall_trends")]
#[command(
    about = "Clean, aggregate and trend-test regional daily rainfall",
    long_about = None
)]
struct Cli {
    /// JSON pipeline configuration (defaults to ./rainfall.json when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show columns, leading rows and missing values of every region source
    Inspect {
        /// Number of leading rows to show per source
        #[arg(short, long, default_value_t = DEFAULT_INSPECT_ROWS)]
        rows: usize,
    },
    /// Convert date codes, coerce precipitation and write the daily table
    Clean,
    /// Sum the daily table into monthly and annual totals
    Aggregate,
    /// Run the Mann-Kendall test and Sen's slope on each region's annual totals
    TrendTest,
    /// Render one annual rainfall chart per region
    Visualize,
    /// Run every stage in order, stopping at the first failure
    RunAll,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let config = PipelineConfig::resolve(cli.config.as_deref())
        .context("failed to load pipeline configuration")?;

    // Logging setup: colored stderr + JSON rolling log file
    let default_log = config.logs_dir().join("rainfall_trends.log");
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or(default_log);
    let log_dir = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let log_file_name = log_file_path
        .file_name()
        .unwrap_or(OsStr::new("rainfall_trends.log"));
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    info!(
        regions = config.regions.len(),
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Inspect { rows } => {
            pipeline::inspect(&config, rows)?;
        }
        Commands::Clean => {
            pipeline::clean(&config)?;
        }
        Commands::Aggregate => {
            pipeline::aggregate(&config)?;
        }
        Commands::TrendTest => {
            pipeline::trend_test(&config)?;
        }
        Commands::Visualize => {
            pipeline::visualize(&config)?;
        }
        Commands::RunAll => {
            pipeline::run_all(&config)?;
        }
    }

    Ok(())
}
