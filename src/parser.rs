//! Raw source parsing: turns a region's CSV export or workbook sheet into
//! [`DailyObservation`]s.
//!
//! Date cells must hold `YYYYDDD` ordinal codes. Precipitation cells that are
//! not finite numbers become missing values; the row itself is kept and the
//! coercion is reported.

use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::{PipelineConfig, RegionSource};
use crate::date_code::OrdinalDateCode;
use crate::error::{PipelineError, Result};
use crate::source::read_source;
use crate::types::DailyObservation;

/// A precipitation cell that could not be read as a number and was recorded
/// as missing.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericCoercion {
    pub region: String,
    pub line: u64,
    pub column: String,
    pub raw: String,
}

impl fmt::Display for NumericCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: line {}: `{}` value {:?} is not numeric, recorded as missing",
            self.region, self.line, self.column, self.raw
        )
    }
}

/// Cleaned rows of one source plus the cells that were coerced to missing.
#[derive(Debug, Default)]
pub struct CleanedSource {
    pub observations: Vec<DailyObservation>,
    pub coercions: Vec<NumericCoercion>,
}

/// Column names the cleaner looks for in every source.
#[derive(Debug, Clone, Copy)]
pub struct SourceColumns<'a> {
    pub date: &'a str,
    pub precipitation: &'a str,
}

impl<'a> From<&'a PipelineConfig> for SourceColumns<'a> {
    fn from(config: &'a PipelineConfig) -> Self {
        SourceColumns {
            date: &config.date_column,
            precipitation: &config.precipitation_column,
        }
    }
}

/// Reads a precipitation cell. Empty cells are plainly missing (`Ok(None)`);
/// anything else that is not a finite number is `Err(())`.
pub fn parse_precipitation(raw: &str) -> std::result::Result<Option<f64>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(()),
    }
}

/// Cleans a single region source.
///
/// # Errors
///
/// [`PipelineError::MissingInput`] if the file (or its sheet) does not exist,
/// [`PipelineError::Schema`] if either column is absent, and
/// [`PipelineError::InvalidDateCode`] on the first date cell that is not a
/// valid ordinal code. No rows are returned on error.
pub fn clean_source(source: &RegionSource, columns: SourceColumns<'_>) -> Result<CleanedSource> {
    let table = read_source(source)?;
    let date_idx = table.column_index(columns.date)?;
    let pcp_idx = table.column_index(columns.precipitation)?;

    let mut cleaned = CleanedSource::default();

    for row in &table.rows {
        let raw_date = row.get(date_idx);
        let date = OrdinalDateCode::parse_cell(raw_date)
            .and_then(OrdinalDateCode::to_date)
            .ok_or_else(|| PipelineError::InvalidDateCode {
                path: table.path.clone(),
                line: row.line,
                value: raw_date.to_string(),
            })?;

        let raw_pcp = row.get(pcp_idx);
        let value = match parse_precipitation(raw_pcp) {
            Ok(value) => value,
            Err(()) => {
                let coercion = NumericCoercion {
                    region: source.name.clone(),
                    line: row.line,
                    column: columns.precipitation.to_string(),
                    raw: raw_pcp.to_string(),
                };
                warn!(%coercion, "Numeric coercion");
                cleaned.coercions.push(coercion);
                None
            }
        };

        cleaned.observations.push(DailyObservation {
            region: source.name.clone(),
            date,
            value,
        });
    }

    debug!(
        region = %source.name,
        rows = cleaned.observations.len(),
        coerced = cleaned.coercions.len(),
        "Source cleaned"
    );
    Ok(cleaned)
}

/// Cleans every configured region and concatenates the rows, sorted by
/// (region, date). Fails on the first source that fails.
pub fn clean_all(config: &PipelineConfig) -> Result<CleanedSource> {
    let columns = SourceColumns::from(config);
    let mut all = CleanedSource::default();

    for source in &config.regions {
        let cleaned = clean_source(source, columns)?;
        all.observations.extend(cleaned.observations);
        all.coercions.extend(cleaned.coercions);
    }

    all.observations
        .sort_by(|a, b| a.region.cmp(&b.region).then(a.date.cmp(&b.date)));
    Ok(all)
}

/// Shape and missingness summary of one raw source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInspection {
    pub region: String,
    pub path: PathBuf,
    pub columns: Vec<String>,
    /// Sheet names when the source is a workbook.
    pub sheets: Vec<String>,
    pub rows: usize,
    pub head: Vec<Vec<String>>,
    /// `(column, missing cells)`, most missing first.
    pub missing_by_column: Vec<(String, usize)>,
}

/// Reads a raw source without cleaning it.
///
/// A cell counts as missing when it is empty; in the precipitation column a
/// non-numeric cell counts as missing too, since cleaning will coerce it.
pub fn inspect_source(
    source: &RegionSource,
    columns: SourceColumns<'_>,
    head_rows: usize,
) -> Result<SourceInspection> {
    let table = read_source(source)?;
    let pcp_idx = table.column_index(columns.precipitation).ok();

    let mut missing = vec![0usize; table.headers.len()];
    for row in &table.rows {
        for (idx, count) in missing.iter_mut().enumerate() {
            let cell = row.get(idx);
            let is_missing = if Some(idx) == pcp_idx {
                !matches!(parse_precipitation(cell), Ok(Some(_)))
            } else {
                cell.trim().is_empty()
            };
            if is_missing {
                *count += 1;
            }
        }
    }

    let mut missing_by_column: Vec<(String, usize)> =
        table.headers.iter().cloned().zip(missing).collect();
    missing_by_column.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let head = table
        .rows
        .iter()
        .take(head_rows)
        .map(|row| row.cells.clone())
        .collect();

    Ok(SourceInspection {
        region: source.name.clone(),
        rows: table.rows.len(),
        head,
        missing_by_column,
        path: table.path,
        columns: table.headers,
        sheets: table.sheets,
    })
}
