//! Rainfall aggregation and trend detection.
//!
//! Cleaned daily rows are summed into monthly and annual totals per region;
//! each region's annual series is then tested for a monotonic trend with the
//! Mann-Kendall test and Sen's slope estimator.

pub mod aggregate;
pub mod label;
pub mod trend;
pub mod utility;
