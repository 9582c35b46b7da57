//! Output formatting and persistence for pipeline tables.
//!
//! Every table is a flat CSV with a fixed column order. Files are always
//! rewritten whole so a rerun with the same inputs reproduces them byte for
//! byte.

use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use csv::WriterBuilder;

/// A row type persisted as one CSV file under the tables directory.
pub trait Table: Serialize + DeserializeOwned {
    const FILE_NAME: &'static str;
    /// Header, in the order columns are written.
    const COLUMNS: &'static [&'static str];
}

/// Logs the first `rows` records using Rust's debug pretty-print format.
pub fn print_preview<T: Debug>(title: &str, records: &[T], rows: usize) {
    info!(total = records.len(), "{title}");
    for record in records.iter().take(rows) {
        info!("{:?}", record);
    }
}

/// Writes `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    create_parent(path)?;
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body + "\n")?;
    Ok(())
}

/// Writes `rows` to `path`, replacing any existing file.
///
/// The header is always written, even for an empty table.
pub fn write_table<T: Table>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");
    create_parent(path)?;

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    writer.write_record(T::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Reads a table written by an earlier stage.
///
/// # Errors
///
/// [`PipelineError::MissingInput`] when the file is absent (with `hint` naming
/// the stage that produces it) and [`PipelineError::Schema`] when one of
/// `T::COLUMNS` is not in the header.
pub fn read_table<T: Table>(path: &Path, hint: &str) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(PipelineError::missing(path, hint));
    }

    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let found: Vec<String> = headers.iter().map(str::to_string).collect();
    for column in T::COLUMNS {
        if !found.iter().any(|h| h == column) {
            return Err(PipelineError::Schema {
                path: path.to_path_buf(),
                column: column.to_string(),
                found,
            });
        }
    }

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result?;
        rows.push(record);
    }

    debug!(path = %path.display(), rows = rows.len(), "Read CSV table");
    Ok(rows)
}

/// Writes each table to its own sheet of a workbook at `path`, replacing any
/// existing file. Sheets get the same header and column order as the CSVs.
pub fn write_workbook(path: &Path, sheets: &[(&str, &dyn SheetSource)]) -> Result<()> {
    debug!(path = %path.display(), sheets = sheets.len(), "Writing workbook");
    create_parent(path)?;

    let mut workbook = Workbook::new();
    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;
        table.fill(worksheet)?;
    }
    workbook.save(path)?;

    Ok(())
}

/// Rows that can be laid out on a worksheet.
pub trait SheetSource {
    fn fill(&self, worksheet: &mut Worksheet) -> Result<()>;
}

impl<T: Table> SheetSource for Vec<T> {
    fn fill(&self, worksheet: &mut Worksheet) -> Result<()> {
        for (col, column) in T::COLUMNS.iter().enumerate() {
            worksheet.write_string(0, col as u16, *column)?;
        }
        for (idx, row) in self.iter().enumerate() {
            let Value::Object(fields) = serde_json::to_value(row)? else {
                continue;
            };
            let sheet_row = idx as u32 + 1;
            for (col, column) in T::COLUMNS.iter().enumerate() {
                let col = col as u16;
                match fields.get(*column) {
                    Some(Value::Number(n)) => {
                        if let Some(v) = n.as_f64() {
                            worksheet.write_number(sheet_row, col, v)?;
                        }
                    }
                    Some(Value::String(text)) => {
                        worksheet.write_string(sheet_row, col, text.as_str())?;
                    }
                    Some(Value::Bool(flag)) => {
                        worksheet.write_boolean(sheet_row, col, *flag)?;
                    }
                    Some(Value::Null) | None => {}
                    Some(other) => {
                        worksheet.write_string(sheet_row, col, other.to_string())?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
