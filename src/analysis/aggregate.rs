use std::collections::BTreeMap;
use tracing::warn;

use crate::types::{DailyObservation, PeriodTotal};

/// Monthly and annual totals, each sorted by (region, year[, month]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub monthly: Vec<PeriodTotal>,
    pub annual: Vec<PeriodTotal>,
}

#[derive(Debug, Default)]
struct Accumulator {
    total: f64,
    observed: usize,
    missing: usize,
}

/// Sums cleaned daily rows into monthly and annual totals per region.
///
/// Only present values are summed; a group whose values are all missing
/// totals 0. Groups exist only for (region, year, month) combinations that
/// have at least one row. Annual totals are rolled up from the monthly ones,
/// so each annual total equals the sum of its months exactly.
pub fn aggregate(observations: &[DailyObservation]) -> Aggregates {
    let monthly = monthly_totals(observations);
    let annual = roll_up_annual(&monthly);

    for total in annual.iter().filter(|t| t.missing_days > 0) {
        warn!(
            region = %total.region,
            year = total.year,
            missing_days = total.missing_days,
            observed_days = total.observed_days,
            "Annual total excludes missing days"
        );
    }

    Aggregates { monthly, annual }
}

/// Monthly totals keyed by (region, year, month), ascending.
pub fn monthly_totals(observations: &[DailyObservation]) -> Vec<PeriodTotal> {
    // Sum in date order so the result does not depend on input order.
    let mut ordered: Vec<&DailyObservation> = observations.iter().collect();
    ordered.sort_by(|a, b| {
        a.region
            .cmp(&b.region)
            .then(a.date.cmp(&b.date))
            .then_with(|| {
                a.value
                    .unwrap_or(f64::NEG_INFINITY)
                    .total_cmp(&b.value.unwrap_or(f64::NEG_INFINITY))
            })
    });

    let mut groups: BTreeMap<(&str, i32, u32), Accumulator> = BTreeMap::new();
    for obs in ordered {
        let acc = groups
            .entry((obs.region.as_str(), obs.year(), obs.month()))
            .or_default();
        match obs.value {
            Some(v) => {
                acc.total += v;
                acc.observed += 1;
            }
            None => acc.missing += 1,
        }
    }

    groups
        .into_iter()
        .map(|((region, year, month), acc)| PeriodTotal {
            region: region.to_string(),
            year,
            month: Some(month),
            total_value: acc.total,
            observed_days: acc.observed,
            missing_days: acc.missing,
        })
        .collect()
}

/// Annual totals keyed by (region, year), ascending.
pub fn annual_totals(observations: &[DailyObservation]) -> Vec<PeriodTotal> {
    roll_up_annual(&monthly_totals(observations))
}

fn roll_up_annual(monthly: &[PeriodTotal]) -> Vec<PeriodTotal> {
    let mut groups: BTreeMap<(&str, i32), Accumulator> = BTreeMap::new();
    for month in monthly {
        let acc = groups
            .entry((month.region.as_str(), month.year))
            .or_default();
        acc.total += month.total_value;
        acc.observed += month.observed_days;
        acc.missing += month.missing_days;
    }

    groups
        .into_iter()
        .map(|((region, year), acc)| PeriodTotal {
            region: region.to_string(),
            year,
            month: None,
            total_value: acc.total,
            observed_days: acc.observed,
            missing_days: acc.missing,
        })
        .collect()
}
