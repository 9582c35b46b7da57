//! Raw region sources: a CSV file, or one sheet of a spreadsheet workbook.
//!
//! Both are read into the same [`RawTable`] of string cells so cleaning and
//! inspection never need to know which format a region came from.

use calamine::{Data, Reader, open_workbook_auto};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::RegionSource;
use crate::error::{PipelineError, Result};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One data row and the 1-based line (CSV) or sheet row (workbook) it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub cells: Vec<String>,
}

impl RawRow {
    /// Cell at `idx`, empty when the row is short.
    pub fn get(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Header and rows of a raw source, all cells as text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Every sheet in the workbook, empty for CSV sources.
    pub sheets: Vec<String>,
}

impl RawTable {
    /// Position of `column` in the header.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Schema`] when no header matches.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::Schema {
                path: self.path.clone(),
                column: column.to_string(),
                found: self.headers.clone(),
            })
    }
}

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Reads a region's source, picking the format from the file extension.
///
/// # Errors
///
/// [`PipelineError::MissingInput`] when the file, or the region's sheet in a
/// workbook, does not exist.
pub fn read_source(source: &RegionSource) -> Result<RawTable> {
    let path = source.source.as_path();
    if !path.exists() {
        return Err(PipelineError::missing(
            path,
            format!("source for region {} not found", source.name),
        ));
    }

    let table = if is_workbook(path) {
        read_sheet(path, source.sheet_name())?
    } else {
        read_csv(path)?
    };
    debug!(
        region = %source.name,
        path = %path.display(),
        rows = table.rows.len(),
        "Source read"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(RawRow {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            cells: record.iter().map(str::to_string).collect(),
        });
    }

    Ok(RawTable {
        path: path.to_path_buf(),
        headers,
        rows,
        sheets: Vec::new(),
    })
}

/// Reads `sheet` of the workbook at `path`. The first non-empty row of the
/// sheet is the header.
fn read_sheet(path: &Path, sheet: &str) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let sheets = workbook.sheet_names();
    if !sheets.iter().any(|s| s == sheet) {
        return Err(PipelineError::missing(
            path,
            format!("no sheet `{sheet}` (found: {})", sheets.join(", ")),
        ));
    }

    let range = workbook.worksheet_range(sheet)?;
    let first_row = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);
    let mut rows = range.rows().enumerate();

    let headers = match rows.next() {
        Some((_, header)) => header.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|(offset, cells)| RawRow {
            line: first_row + offset as u64 + 1,
            cells: cells.iter().map(cell_text).collect(),
        })
        .collect();

    Ok(RawTable {
        path: path.to_path_buf(),
        headers,
        rows,
        sheets,
    })
}

/// Cell text as a CSV export of the sheet would hold it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}
