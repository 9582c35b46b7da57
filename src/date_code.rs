//! Ordinal `YYYYDDD` date codes.
//!
//! Raw station exports key each day by `YEAR * 1000 + DAY_OF_YEAR`, with the
//! day of year counted from 1. `2008060` is therefore 29 February 2008.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// An integer date code of the form `YEAR * 1000 + DAY_OF_YEAR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrdinalDateCode(pub i64);

impl OrdinalDateCode {
    pub fn year(self) -> i64 {
        self.0.div_euclid(1000)
    }

    pub fn day_of_year(self) -> u32 {
        self.0.rem_euclid(1000) as u32
    }

    /// Calendar date for this code, `None` when the day of year falls
    /// outside the year (day 0, day 366 of a common year, ...).
    pub fn to_date(self) -> Option<NaiveDate> {
        let year = i32::try_from(self.year()).ok()?;
        NaiveDate::from_yo_opt(year, self.day_of_year())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        OrdinalDateCode(date.year() as i64 * 1000 + date.ordinal() as i64)
    }

    /// Parses a raw table cell. Spreadsheet exports sometimes render the
    /// code as a float (`2005001.0`), which is accepted when integral.
    pub fn parse_cell(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(code) = raw.parse::<i64>() {
            return Some(OrdinalDateCode(code));
        }
        let value = raw.parse::<f64>().ok()?;
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Some(OrdinalDateCode(value as i64))
        } else {
            None
        }
    }
}

impl fmt::Display for OrdinalDateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:07}", self.0)
    }
}

/// Converts a raw date cell straight to a calendar date.
pub fn parse_date_code(raw: &str) -> Option<NaiveDate> {
    OrdinalDateCode::parse_cell(raw)?.to_date()
}
