//! Pipeline configuration.
//!
//! Stored as a plain JSON object on disk:
//! ```json
//! {
//!   "output_dir": "outputs",
//!   "date_column": "Date",
//!   "precipitation_column": "PCP",
//!   "regions": [
//!     { "name": "Kwara", "source": "data/weather_data_3_states.xlsx" },
//!     { "name": "Benue", "source": "data/weather_data_3_states.xlsx", "sheet": "Benue" },
//!     { "name": "Oyo", "source": "data/oyo.csv" }
//!   ]
//! }
//! ```
//! Every field is optional; omitted fields fall back to [`PipelineConfig::default`].
//! A workbook source is read from the sheet named by `sheet`, or from the sheet
//! named after the region when `sheet` is omitted.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "rainfall.json";

/// Workbook holding one sheet per default region.
pub const DEFAULT_WORKBOOK: &str = "data/weather_data_3_states.xlsx";

/// One region partition and the source that holds its daily rows: a CSV file
/// or a sheet of a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSource {
    pub name: String,
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl RegionSource {
    /// Sheet to read when the source is a workbook.
    pub fn sheet_name(&self) -> &str {
        self.sheet.as_deref().unwrap_or(&self.name)
    }
}

/// Explicit configuration handed to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub date_column: String,
    pub precipitation_column: String,
    pub regions: Vec<RegionSource>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let regions = ["Kwara", "Benue", "Niger"]
            .into_iter()
            .map(|name| RegionSource {
                name: name.to_string(),
                source: PathBuf::from(DEFAULT_WORKBOOK),
                sheet: None,
            })
            .collect();

        Self {
            output_dir: PathBuf::from("outputs"),
            date_column: "Date".to_string(),
            precipitation_column: "PCP".to_string(),
            regions,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::missing(path, "configuration file not found"));
        }
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the config the CLI should run with: an explicit path must
    /// exist, otherwise `rainfall.json` is used when present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one region must be configured".to_string(),
            ));
        }
        if self.date_column.trim().is_empty() || self.precipitation_column.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "column names must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.name.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "region names must not be empty".to_string(),
                ));
            }
            if !seen.insert(region.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "region `{}` is configured more than once",
                    region.name
                )));
            }
        }
        Ok(())
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.output_dir.join("tables")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_dir.join("plots")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }

    /// Creates the tables, plots and logs directories if they don't exist.
    pub fn ensure_output_dirs(&self) -> Result<()> {
        for dir in [self.tables_dir(), self.plots_dir(), self.logs_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
