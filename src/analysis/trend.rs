//! Mann-Kendall trend test with Sen's slope estimator.
//!
//! All pairwise loops are O(n²); series are one point per year, so n stays in
//! the tens.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::analysis::label::label;
use crate::analysis::utility::{median, two_sided_p_value};
use crate::error::{PipelineError, Result};
use crate::types::{PeriodTotal, TrendResult};

/// Raw Mann-Kendall test output for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannKendall {
    pub s: i64,
    pub var_s: f64,
    pub z: f64,
    pub p_value: f64,
    pub tau: f64,
}

/// Robust line `total = slope * year + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SenSlope {
    pub slope: f64,
    pub intercept: f64,
}

fn sign(diff: f64) -> i64 {
    match diff.partial_cmp(&0.0) {
        Some(Ordering::Greater) => 1,
        Some(Ordering::Less) => -1,
        _ => 0,
    }
}

/// `S = sum over i < j of sign(x_j - x_i)`.
pub fn s_statistic(values: &[f64]) -> i64 {
    let mut s = 0;
    for i in 0..values.len() {
        for j in (i + 1)..values.len() {
            s += sign(values[j] - values[i]);
        }
    }
    s
}

/// Sizes of the groups of exactly equal values that have more than one member.
pub fn tie_groups(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut groups = Vec::new();
    let mut run = 1;
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
        } else {
            if run > 1 {
                groups.push(run);
            }
            run = 1;
        }
    }
    if run > 1 && sorted.len() > 1 {
        groups.push(run);
    }
    groups
}

/// Tie-corrected variance of S:
/// `[n(n-1)(2n+5) - sum t(t-1)(2t+5)] / 18`.
pub fn variance_s(n: usize, ties: &[usize]) -> f64 {
    let term = |t: usize| {
        let t = t as f64;
        t * (t - 1.0) * (2.0 * t + 5.0)
    };
    let ties_total: f64 = ties.iter().map(|&t| term(t)).sum();
    (term(n) - ties_total) / 18.0
}

/// Standardized statistic with the ±1 continuity correction. Zero when S is
/// zero or the variance is degenerate.
pub fn z_statistic(s: i64, var_s: f64) -> f64 {
    if var_s <= 0.0 {
        return 0.0;
    }
    let sd = var_s.sqrt();
    match s.cmp(&0) {
        Ordering::Greater => (s - 1) as f64 / sd,
        Ordering::Less => (s + 1) as f64 / sd,
        Ordering::Equal => 0.0,
    }
}

/// Kendall's tau, `S / sqrt((n0 - n1) * n0)` with `n0 = n(n-1)/2` and `n1`
/// the number of tied pairs. Zero when every value is tied.
pub fn kendall_tau(s: i64, n: usize, ties: &[usize]) -> f64 {
    let pairs = |t: usize| (t * t.saturating_sub(1)) as f64 / 2.0;
    let n0 = pairs(n);
    let n1: f64 = ties.iter().map(|&t| pairs(t)).sum();
    let denominator = ((n0 - n1) * n0).sqrt();
    if denominator > 0.0 {
        (s as f64 / denominator).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Runs the Mann-Kendall test on a time-ordered series.
pub fn mann_kendall(values: &[f64]) -> MannKendall {
    let n = values.len();
    let s = s_statistic(values);
    let ties = tie_groups(values);
    let var_s = variance_s(n, &ties);
    let z = z_statistic(s, var_s);

    MannKendall {
        s,
        var_s,
        z,
        p_value: two_sided_p_value(z),
        tau: kendall_tau(s, n, &ties),
    }
}

/// Sen's slope: the median of all pairwise slopes
/// `(x_j - x_i) / (year_j - year_i)`, with the intercept anchored at the
/// medians, `median(x) - slope * median(year)`.
///
/// Pairs sharing a year are skipped. Returns `None` when no pair remains.
pub fn sens_slope(years: &[i32], values: &[f64]) -> Option<SenSlope> {
    let n = years.len().min(values.len());
    let mut slopes = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = f64::from(years[j]) - f64::from(years[i]);
            if dx != 0.0 {
                slopes.push((values[j] - values[i]) / dx);
            }
        }
    }

    let slope = median(&slopes)?;
    let years_f: Vec<f64> = years[..n].iter().map(|&y| f64::from(y)).collect();
    let intercept = median(&values[..n])? - slope * median(&years_f)?;
    Some(SenSlope { slope, intercept })
}

/// Tests one region's annual series, which must be sorted by year.
///
/// # Errors
///
/// [`PipelineError::InsufficientData`] when the series has fewer than two
/// years.
pub fn analyze_region(region: &str, series: &[PeriodTotal]) -> Result<TrendResult> {
    let insufficient = || PipelineError::InsufficientData {
        region: region.to_string(),
        found: series.len(),
    };
    if series.len() < 2 {
        return Err(insufficient());
    }

    let years: Vec<i32> = series.iter().map(|t| t.year).collect();
    let values: Vec<f64> = series.iter().map(|t| t.total_value).collect();

    let mk = mann_kendall(&values);
    let sen = sens_slope(&years, &values).ok_or_else(insufficient)?;
    let (is_significant, trend_label) = label(mk.p_value, mk.s);

    Ok(TrendResult {
        region: region.to_string(),
        start_year: years[0],
        end_year: years[years.len() - 1],
        n_years: series.len(),
        trend_label,
        is_significant,
        p_value: mk.p_value,
        z_statistic: mk.z,
        kendall_tau: mk.tau,
        s_statistic: mk.s,
        sen_slope: sen.slope,
        sen_intercept: sen.intercept,
    })
}

/// Groups annual totals by region, orders each series by year and tests it.
/// Results are sorted by region. Fails on the first region with too few years.
pub fn analyze_all(annual: &[PeriodTotal]) -> Result<Vec<TrendResult>> {
    let mut by_region: BTreeMap<&str, Vec<PeriodTotal>> = BTreeMap::new();
    for total in annual {
        by_region
            .entry(total.region.as_str())
            .or_default()
            .push(total.clone());
    }

    by_region
        .into_iter()
        .map(|(region, mut series)| {
            series.sort_by_key(|t| t.year);
            analyze_region(region, &series)
        })
        .collect()
}
