//! Records passed between pipeline stages and the rows of the flat output tables.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::output::Table;

/// One cleaned daily reading. `value` is `None` when the raw cell was empty
/// or could not be read as a finite number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub region: String,
    pub date: NaiveDate,
    #[serde(rename = "precipitation")]
    pub value: Option<f64>,
}

impl DailyObservation {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

impl Table for DailyObservation {
    const FILE_NAME: &'static str = "clean_daily_data.csv";
    const COLUMNS: &'static [&'static str] = &["region", "date", "precipitation"];
}

/// Sum of the present daily values of one region over a month, or over a
/// whole year when `month` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTotal {
    pub region: String,
    pub year: i32,
    pub month: Option<u32>,
    pub total_value: f64,
    pub observed_days: usize,
    pub missing_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotalRow {
    pub region: String,
    pub year: i32,
    pub month: u32,
    pub monthly_total: f64,
    pub observed_days: usize,
    pub missing_days: usize,
}

impl Table for MonthlyTotalRow {
    const FILE_NAME: &'static str = "monthly_rainfall_totals.csv";
    const COLUMNS: &'static [&'static str] = &[
        "region",
        "year",
        "month",
        "monthly_total",
        "observed_days",
        "missing_days",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualTotalRow {
    pub region: String,
    pub year: i32,
    pub annual_total: f64,
    pub observed_days: usize,
    pub missing_days: usize,
}

impl Table for AnnualTotalRow {
    const FILE_NAME: &'static str = "annual_rainfall_totals.csv";
    const COLUMNS: &'static [&'static str] =
        &["region", "year", "annual_total", "observed_days", "missing_days"];
}

impl From<&PeriodTotal> for MonthlyTotalRow {
    fn from(total: &PeriodTotal) -> Self {
        MonthlyTotalRow {
            region: total.region.clone(),
            year: total.year,
            month: total.month.unwrap_or_default(),
            monthly_total: total.total_value,
            observed_days: total.observed_days,
            missing_days: total.missing_days,
        }
    }
}

impl From<&PeriodTotal> for AnnualTotalRow {
    fn from(total: &PeriodTotal) -> Self {
        AnnualTotalRow {
            region: total.region.clone(),
            year: total.year,
            annual_total: total.total_value,
            observed_days: total.observed_days,
            missing_days: total.missing_days,
        }
    }
}

impl From<AnnualTotalRow> for PeriodTotal {
    fn from(row: AnnualTotalRow) -> Self {
        PeriodTotal {
            region: row.region,
            year: row.year,
            month: None,
            total_value: row.annual_total,
            observed_days: row.observed_days,
            missing_days: row.missing_days,
        }
    }
}

/// Direction of a monotonic trend, `NoTrend` unless the test is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Increasing,
    Decreasing,
    NoTrend,
}

impl TrendLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendLabel::Increasing => "increasing",
            TrendLabel::Decreasing => "decreasing",
            TrendLabel::NoTrend => "no_trend",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mann-Kendall test and Sen's slope for one region's annual series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub region: String,
    pub start_year: i32,
    pub end_year: i32,
    pub n_years: usize,
    pub trend_label: TrendLabel,
    #[serde(with = "flag")]
    pub is_significant: bool,
    pub p_value: f64,
    pub z_statistic: f64,
    pub kendall_tau: f64,
    pub s_statistic: i64,
    pub sen_slope: f64,
    pub sen_intercept: f64,
}

impl Table for TrendResult {
    const FILE_NAME: &'static str = "trend_results_mk_sen.csv";
    const COLUMNS: &'static [&'static str] = &[
        "region",
        "start_year",
        "end_year",
        "n_years",
        "trend_label",
        "is_significant",
        "p_value",
        "z_statistic",
        "kendall_tau",
        "s_statistic",
        "sen_slope",
        "sen_intercept",
    ];
}

/// Booleans are written as `0`/`1` in the flat tables.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_label_strings() {
        assert_eq!(TrendLabel::Increasing.to_string(), "increasing");
        assert_eq!(TrendLabel::Decreasing.to_string(), "decreasing");
        assert_eq!(TrendLabel::NoTrend.to_string(), "no_trend");
        assert_eq!(
            serde_json::to_string(&TrendLabel::NoTrend).unwrap(),
            "\"no_trend\""
        );
    }

    #[test]
    fn test_is_significant_serializes_as_integer() {
        let result = TrendResult {
            region: "Kwara".to_string(),
            start_year: 2005,
            end_year: 2009,
            n_years: 5,
            trend_label: TrendLabel::Increasing,
            is_significant: true,
            p_value: 0.01,
            z_statistic: 2.5,
            kendall_tau: 1.0,
            s_statistic: 10,
            sen_slope: 3.0,
            sen_intercept: -6000.0,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["is_significant"], 1);
        assert_eq!(json["trend_label"], "increasing");
    }

    #[test]
    fn test_period_total_to_rows() {
        let total = PeriodTotal {
            region: "Niger".to_string(),
            year: 2010,
            month: Some(7),
            total_value: 210.5,
            observed_days: 30,
            missing_days: 1,
        };
        let monthly = MonthlyTotalRow::from(&total);
        assert_eq!(monthly.month, 7);
        assert_eq!(monthly.monthly_total, 210.5);

        let annual = AnnualTotalRow::from(&total);
        assert_eq!(annual.annual_total, 210.5);
        let back = PeriodTotal::from(annual);
        assert_eq!(back.month, None);
        assert_eq!(back.missing_days, 1);
    }

    #[test]
    fn test_daily_observation_calendar_parts() {
        let obs = DailyObservation {
            region: "Benue".to_string(),
            date: NaiveDate::from_ymd_opt(2008, 2, 29).unwrap(),
            value: None,
        };
        assert_eq!(obs.year(), 2008);
        assert_eq!(obs.month(), 2);
    }
}
