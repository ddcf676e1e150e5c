//! Quarter-over-quarter price trend from a daily close series (reference engine).

use crate::models::{PricePoint, QuarterlyTrend};

/// Fewer valid closes than this yields no trend.
pub const MIN_TREND_POINTS: usize = 30;

/// Roughly one quarter of trading days.
pub const QUARTER_LOOKBACK: usize = 63;

/// Trend over the last quarter of `closes`, oldest first.
///
/// Non-positive closes are ignored. The lookback shrinks to half the valid
/// series when it is shorter than two quarters.
pub fn from_closes(closes: &[f64]) -> Option<QuarterlyTrend> {
    let valid: Vec<f64> = closes.iter().copied().filter(|c| *c > 0.0).collect();
    if valid.len() < MIN_TREND_POINTS {
        return None;
    }

    let lookback = QUARTER_LOOKBACK.min(valid.len() / 2).max(1);
    let window = &valid[valid.len() - lookback..];
    let first = window[0];
    let last = window[window.len() - 1];
    let q_return = last / first - 1.0;

    Some(QuarterlyTrend {
        quarter_pct: q_return * 100.0,
        q_return,
        slope: ols_slope(window),
        last,
    })
}

/// Sort `points` by date and estimate the trend of their closes.
pub fn trend_from_history(points: &[PricePoint]) -> Option<QuarterlyTrend> {
    sorted_closes(points).and_then(|closes| from_closes(&closes))
}

/// Closes of `points` in date order; `None` for fewer than two points.
pub fn sorted_closes(points: &[PricePoint]) -> Option<Vec<f64>> {
    if points.len() < 2 {
        return None;
    }
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);
    Some(sorted.into_iter().map(|p| p.close).collect())
}

/// Least-squares slope of `values` against their 0-based index.
fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
