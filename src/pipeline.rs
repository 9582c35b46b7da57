//! The five pipeline stages and the orchestrator that chains them.
//!
//! Each stage reads what the previous one wrote under the tables directory,
//! so every stage can also be invoked on its own. Outputs are overwritten on
//! every run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::aggregate::aggregate as aggregate_totals;
use crate::analysis::trend::analyze_all;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::output::{
    SheetSource, Table, print_preview, read_table, write_json, write_table, write_workbook,
};
use crate::parser::{SourceColumns, SourceInspection, clean_all, inspect_source};
use crate::types::{AnnualTotalRow, DailyObservation, MonthlyTotalRow, PeriodTotal, TrendResult};
use crate::visualize::{PlotSeries, plot_file_name, render_annual_chart};

/// Rows shown by `inspect` when no count is given.
pub const DEFAULT_INSPECT_ROWS: usize = 8;

/// Workbook holding the monthly and annual tables, one sheet each.
pub const TOTALS_WORKBOOK_FILE: &str = "rainfall_outputs.xlsx";

/// JSON copy of the trend results table.
pub const TREND_JSON_FILE: &str = "trend_results_mk_sen.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Inspect,
    Clean,
    Aggregate,
    TrendTest,
    Visualize,
}

impl Stage {
    /// Execution order used by [`run_all`].
    pub const ALL: [Stage; 5] = [
        Stage::Inspect,
        Stage::Clean,
        Stage::Aggregate,
        Stage::TrendTest,
        Stage::Visualize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Inspect => "inspect",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::TrendTest => "trend-test",
            Stage::Visualize => "visualize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The stage a run stopped at, and why.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanReport {
    pub path: PathBuf,
    pub rows: usize,
    pub coerced: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub monthly_path: PathBuf,
    pub annual_path: PathBuf,
    pub workbook_path: PathBuf,
    pub monthly_rows: usize,
    pub annual_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
    pub results: Vec<TrendResult>,
}

pub fn table_path<T: Table>(config: &PipelineConfig) -> PathBuf {
    config.tables_dir().join(T::FILE_NAME)
}

/// Summarizes every configured source. Missing or unreadable sources are
/// reported and skipped.
#[tracing::instrument(skip(config))]
pub fn inspect(config: &PipelineConfig, rows: usize) -> Result<Vec<SourceInspection>> {
    config.ensure_output_dirs()?;
    let columns = SourceColumns::from(config);
    let mut inspections = Vec::new();

    for source in &config.regions {
        match inspect_source(source, columns, rows) {
            Ok(inspection) => {
                info!(
                    region = %inspection.region,
                    path = %inspection.path.display(),
                    rows = inspection.rows,
                    columns = ?inspection.columns,
                    "Source"
                );
                if !inspection.sheets.is_empty() {
                    info!(region = %inspection.region, sheets = ?inspection.sheets, "Sheets found");
                }
                for row in &inspection.head {
                    info!(region = %inspection.region, "{}", row.join(" | "));
                }
                for (column, missing) in inspection.missing_by_column.iter().take(10) {
                    info!(region = %inspection.region, column = %column, missing, "Missing values");
                }
                inspections.push(inspection);
            }
            Err(e) => {
                warn!(region = %source.name, error = %e, "Source could not be inspected");
            }
        }
    }

    info!(
        inspected = inspections.len(),
        configured = config.regions.len(),
        "Inspection complete"
    );
    Ok(inspections)
}

/// Cleans every region source into the daily table.
#[tracing::instrument(skip(config))]
pub fn clean(config: &PipelineConfig) -> Result<CleanReport> {
    config.ensure_output_dirs()?;

    let cleaned = clean_all(config).inspect_err(|e| error!(error = %e, "Cleaning failed"))?;
    if !cleaned.coercions.is_empty() {
        warn!(
            coerced = cleaned.coercions.len(),
            "Non-numeric precipitation values recorded as missing"
        );
    }

    let path = table_path::<DailyObservation>(config);
    write_table(&path, &cleaned.observations)?;
    info!(path = %path.display(), rows = cleaned.observations.len(), "Cleaned daily data saved");
    print_preview("Cleaned daily data", &cleaned.observations, 5);

    Ok(CleanReport {
        path,
        rows: cleaned.observations.len(),
        coerced: cleaned.coercions.len(),
    })
}

/// Sums the daily table into monthly and annual totals.
#[tracing::instrument(skip(config))]
pub fn aggregate(config: &PipelineConfig) -> Result<AggregateReport> {
    config.ensure_output_dirs()?;

    let daily_path = table_path::<DailyObservation>(config);
    let daily: Vec<DailyObservation> = read_table(&daily_path, "run `clean` first")
        .inspect_err(|e| error!(error = %e, "Daily data unavailable"))?;

    let totals = aggregate_totals(&daily);
    let monthly: Vec<MonthlyTotalRow> = totals.monthly.iter().map(MonthlyTotalRow::from).collect();
    let annual: Vec<AnnualTotalRow> = totals.annual.iter().map(AnnualTotalRow::from).collect();

    let monthly_path = table_path::<MonthlyTotalRow>(config);
    let annual_path = table_path::<AnnualTotalRow>(config);
    write_table(&monthly_path, &monthly)?;
    info!(path = %monthly_path.display(), rows = monthly.len(), "Monthly totals saved");
    write_table(&annual_path, &annual)?;
    info!(path = %annual_path.display(), rows = annual.len(), "Annual totals saved");

    let workbook_path = config.tables_dir().join(TOTALS_WORKBOOK_FILE);
    write_workbook(
        &workbook_path,
        &[
            ("Monthly_Totals", &monthly as &dyn SheetSource),
            ("Annual_Totals", &annual as &dyn SheetSource),
        ],
    )?;
    info!(path = %workbook_path.display(), "Workbook export saved");
    print_preview("Annual totals", &annual, 10);

    Ok(AggregateReport {
        monthly_path,
        annual_path,
        workbook_path,
        monthly_rows: monthly.len(),
        annual_rows: annual.len(),
    })
}

fn load_annual(config: &PipelineConfig) -> Result<Vec<PeriodTotal>> {
    let path = table_path::<AnnualTotalRow>(config);
    let rows: Vec<AnnualTotalRow> = read_table(&path, "run `aggregate` first")
        .inspect_err(|e| error!(error = %e, "Annual totals unavailable"))?;
    Ok(rows.into_iter().map(PeriodTotal::from).collect())
}

/// Runs the Mann-Kendall / Sen's slope test on every region's annual series.
#[tracing::instrument(skip(config))]
pub fn trend_test(config: &PipelineConfig) -> Result<TrendReport> {
    config.ensure_output_dirs()?;

    let annual = load_annual(config)?;
    let results = analyze_all(&annual).inspect_err(|e| error!(error = %e, "Trend test failed"))?;

    for result in &results {
        info!(
            region = %result.region,
            trend = %result.trend_label,
            p_value = result.p_value,
            s = result.s_statistic,
            sen_slope = result.sen_slope,
            "Trend"
        );
    }

    let csv_path = table_path::<TrendResult>(config);
    let json_path = config.tables_dir().join(TREND_JSON_FILE);
    write_table(&csv_path, &results)?;
    write_json(&json_path, &results)?;
    info!(path = %csv_path.display(), json = %json_path.display(), "Trend results saved");

    Ok(TrendReport {
        csv_path,
        json_path,
        results,
    })
}

/// Renders one chart per region from the annual table.
#[tracing::instrument(skip(config))]
pub fn visualize(config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    config.ensure_output_dirs()?;

    let annual = load_annual(config)?;
    let mut by_region: BTreeMap<String, Vec<PeriodTotal>> = BTreeMap::new();
    for total in annual {
        by_region.entry(total.region.clone()).or_default().push(total);
    }

    let mut written = Vec::new();
    for (region, series) in &by_region {
        let plot = PlotSeries::from_annual(region, series);
        let path = config.plots_dir().join(plot_file_name(region));
        render_annual_chart(&plot, &path)?;
        info!(region = %region, path = %path.display(), "Plot saved");
        written.push(path);
    }

    Ok(written)
}

/// Runs a single stage, discarding its report.
pub fn run_stage(stage: Stage, config: &PipelineConfig) -> Result<()> {
    match stage {
        Stage::Inspect => inspect(config, DEFAULT_INSPECT_ROWS).map(|_| ()),
        Stage::Clean => clean(config).map(|_| ()),
        Stage::Aggregate => aggregate(config).map(|_| ()),
        Stage::TrendTest => trend_test(config).map(|_| ()),
        Stage::Visualize => visualize(config).map(|_| ()),
    }
}

/// Runs every stage in order and stops at the first one that fails.
pub fn run_all(config: &PipelineConfig) -> std::result::Result<(), StageFailure> {
    for stage in Stage::ALL {
        info!(stage = %stage, "Running stage");
        if let Err(error) = run_stage(stage, config) {
            error!(stage = %stage, error = %error, "Failed at stage");
            return Err(StageFailure { stage, error });
        }
    }

    info!(
        tables = %config.tables_dir().display(),
        plots = %config.plots_dir().display(),
        "All stages completed successfully"
    );
    Ok(())
}
