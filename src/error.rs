//! Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required source or intermediate table does not exist
    #[error("missing input {}: {hint}", .path.display())]
    MissingInput { path: PathBuf, hint: String },

    /// A required column is absent or misnamed
    #[error("{} has no `{column}` column (found: {})", .path.display(), .found.join(", "))]
    Schema {
        path: PathBuf,
        column: String,
        found: Vec<String>,
    },

    /// A date cell is not a valid `YYYYDDD` ordinal code
    #[error("invalid ordinal date code `{value}` in {} at line {line}", .path.display())]
    InvalidDateCode {
        path: PathBuf,
        line: u64,
        value: String,
    },

    /// Too few annual points to estimate a trend
    #[error("region {region} has {found} annual data point(s), at least 2 are required")]
    InsufficientData { region: String, found: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to render plot: {0}")]
    Render(String),

    #[error("failed to read or write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("failed to write workbook: {0}")]
    WorkbookExport(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn missing(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        PipelineError::MissingInput {
            path: path.into(),
            hint: hint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_path_and_column() {
        let err = PipelineError::Schema {
            path: PathBuf::from("data/kwara.csv"),
            column: "PCP".to_string(),
            found: vec!["Date".to_string(), "TMAX".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("data/kwara.csv"));
        assert!(msg.contains("`PCP`"));
        assert!(msg.contains("Date, TMAX"));
    }

    #[test]
    fn test_missing_input_includes_hint() {
        let err = PipelineError::missing("outputs/tables/x.csv", "run `clean` first");
        assert_eq!(
            err.to_string(),
            "missing input outputs/tables/x.csv: run `clean` first"
        );
    }
}
