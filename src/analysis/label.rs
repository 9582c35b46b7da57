use crate::types::TrendLabel;

/// Significance level of the two-sided trend test.
pub const ALPHA: f64 = 0.05;

/// Labels a test outcome from its p-value and the sign of `S`.
///
/// | p < ALPHA | S     | Label        |
/// |-----------|-------|--------------|
/// | yes       | > 0   | increasing   |
/// | yes       | < 0   | decreasing   |
/// | otherwise |       | no_trend     |
pub fn label(p_value: f64, s: i64) -> (bool, TrendLabel) {
    let significant = p_value < ALPHA;
    let label = match s {
        s if significant && s > 0 => TrendLabel::Increasing,
        s if significant && s < 0 => TrendLabel::Decreasing,
        _ => TrendLabel::NoTrend,
    };
    (significant, label)
}
