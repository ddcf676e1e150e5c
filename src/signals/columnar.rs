//! Accelerated engine: sort-and-sweep over flat columns instead of nested maps.
//!
//! Served by the `insider-engine` binary. Results must agree with the
//! reference engine: identical anomaly flags and z-scores within 0.01.

use chrono::Datelike;

use crate::{
    models::{AnomalySignal, InsiderSellRecord, QuarterlyTrend},
    signals::{
        anomaly::{sort_by_z, Windows, STD_EPSILON},
        AnomalyParams,
    },
};

const MIN_TREND_POINTS: usize = 30;
const MAX_LOOKBACK: usize = 63;

/// Row of the flattened input: ticker index, day number, shares.
#[derive(Debug, Clone, Copy)]
struct Row {
    ticker: usize,
    day: i32,
    shares: f64,
}

pub fn compute_signals(records: &[InsiderSellRecord], params: &AnomalyParams) -> Vec<AnomalySignal> {
    if records.is_empty() {
        return Vec::new();
    }

    // Intern tickers into a sorted dictionary so rows sort on integers.
    let mut tickers: Vec<String> = records
        .iter()
        .map(|r| r.ticker.trim().to_ascii_uppercase())
        .collect();
    tickers.sort_unstable();
    tickers.dedup();

    let mut rows: Vec<Row> = records
        .iter()
        .map(|r| Row {
            ticker: tickers
                .binary_search(&r.ticker.trim().to_ascii_uppercase())
                .unwrap_or_default(),
            day: r.transaction_date.num_days_from_ce(),
            shares: r.shares_sold,
        })
        .collect();
    // Stable: equal (ticker, day) rows keep input order, so daily sums match the reference.
    rows.sort_by_key(|row| (row.ticker, row.day));

    let windows = Windows::from_params(params);
    let as_of = windows.as_of.num_days_from_ce();
    let current_start = windows.current_start.num_days_from_ce();
    let baseline_start = windows.baseline_start.num_days_from_ce();
    let window_days = windows.current_len_days() as f64;

    let mut signals = Vec::with_capacity(tickers.len());
    let mut baseline: Vec<f64> = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let ticker = rows[start].ticker;
        let mut end = start;
        baseline.clear();
        let mut current_total = 0.0_f64;

        while end < rows.len() && rows[end].ticker == ticker {
            let day = rows[end].day;
            let mut day_total = 0.0_f64;
            while end < rows.len() && rows[end].ticker == ticker && rows[end].day == day {
                day_total += rows[end].shares;
                end += 1;
            }
            if day >= baseline_start && day < current_start {
                baseline.push(day_total);
            }
            if day >= current_start && day <= as_of {
                current_total += day_total;
            }
        }

        signals.push(sweep_score(
            &tickers[ticker],
            &baseline,
            current_total,
            window_days,
            params,
        ));
        start = end;
    }

    sort_by_z(&mut signals);
    signals
}

fn sweep_score(
    ticker: &str,
    baseline: &[f64],
    current_total: f64,
    window_days: f64,
    params: &AnomalyParams,
) -> AnomalySignal {
    let n = baseline.len();
    if n == 0 || n < params.min_baseline_points {
        return AnomalySignal {
            ticker: ticker.to_string(),
            current_shares_sold: current_total,
            baseline_mean: 0.0,
            baseline_std: 0.0,
            z_score: 0.0,
            is_anomaly: false,
        };
    }

    let mut sum = 0.0_f64;
    for v in baseline {
        sum += v;
    }
    let mean = sum / n as f64;
    let mut sq = 0.0_f64;
    for v in baseline {
        sq += (v - mean) * (v - mean);
    }
    let mut std = (sq / n as f64).sqrt();
    if std <= 0.0 {
        std = STD_EPSILON;
    }
    let z = (current_total / window_days - mean) / std;

    AnomalySignal {
        ticker: ticker.to_string(),
        current_shares_sold: current_total,
        baseline_mean: mean,
        baseline_std: std,
        z_score: z,
        is_anomaly: z >= params.std_threshold && current_total > 0.0,
    }
}

/// Quarterly trend using running sums for the regression.
pub fn from_closes(closes: &[f64]) -> Option<QuarterlyTrend> {
    let valid: Vec<f64> = closes.iter().copied().filter(|c| *c > 0.0).collect();
    if valid.len() < MIN_TREND_POINTS {
        return None;
    }
    let lookback = MAX_LOOKBACK.min(valid.len() / 2).max(1);
    let window = &valid[valid.len() - lookback..];
    let last = window[window.len() - 1];
    let q_return = last / window[0] - 1.0;

    let n = window.len() as f64;
    let (mut sum_y, mut sum_xy) = (0.0_f64, 0.0_f64);
    for (i, y) in window.iter().enumerate() {
        sum_y += y;
        sum_xy += i as f64 * y;
    }
    let sum_x = n * (n - 1.0) / 2.0;
    let sum_xx = (n - 1.0) * n * (2.0 * n - 1.0) / 6.0;
    let denom = n * sum_xx - sum_x * sum_x;
    let slope = if denom == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denom
    };

    Some(QuarterlyTrend {
        quarter_pct: q_return * 100.0,
        q_return,
        slope,
        last,
    })
}
