//! Z-score anomaly scoring of insider-selling volume (reference engine).

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use chrono::{Duration, NaiveDate};

use crate::{
    models::{AnomalySignal, InsiderSellRecord},
    signals::AnomalyParams,
};

/// Stand-in deviation for a perfectly flat baseline.
pub const STD_EPSILON: f64 = 1e-9;

/// Date boundaries derived from [`AnomalyParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    /// Inclusive start of the baseline window.
    pub baseline_start: NaiveDate,
    /// Exclusive end of the baseline window; equals `current_start`.
    pub baseline_end: NaiveDate,
    /// Inclusive start of the current window, which ends at `as_of` inclusive.
    pub current_start: NaiveDate,
    pub as_of: NaiveDate,
}

impl Windows {
    /// Window boundaries; spans reaching past the calendar saturate at its start.
    pub fn from_params(params: &AnomalyParams) -> Self {
        let current_start = days_before(params.as_of, params.current_days);
        Self {
            baseline_start: days_before(current_start, params.baseline_days),
            baseline_end: current_start,
            current_start,
            as_of: params.as_of,
        }
    }

    pub fn in_baseline(&self, date: NaiveDate) -> bool {
        date >= self.baseline_start && date < self.baseline_end
    }

    pub fn in_current(&self, date: NaiveDate) -> bool {
        date >= self.current_start && date <= self.as_of
    }

    /// Calendar days covered by the current window, at least 1.
    pub fn current_len_days(&self) -> i64 {
        ((self.as_of - self.current_start).num_days() + 1).max(1)
    }
}

fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|span| date.checked_sub_signed(span))
        .unwrap_or(if days >= 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Score every ticker present in `records`, highest z-score first.
pub fn compute_signals(records: &[InsiderSellRecord], params: &AnomalyParams) -> Vec<AnomalySignal> {
    let windows = Windows::from_params(params);

    let mut daily: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();
    for record in records {
        *daily
            .entry(record.ticker.trim().to_ascii_uppercase())
            .or_default()
            .entry(record.transaction_date)
            .or_insert(0.0) += record.shares_sold;
    }

    let window_days = windows.current_len_days() as f64;
    let mut signals: Vec<AnomalySignal> = daily
        .into_iter()
        .map(|(ticker, by_date)| {
            let mut baseline_totals = Vec::new();
            let mut current_total = 0.0_f64;
            for (date, shares) in by_date {
                if windows.in_baseline(date) {
                    baseline_totals.push(shares);
                }
                if windows.in_current(date) {
                    current_total += shares;
                }
            }
            score(ticker, &baseline_totals, current_total, window_days, params)
        })
        .collect();

    sort_by_z(&mut signals);
    signals
}

fn score(
    ticker: String,
    baseline_totals: &[f64],
    current_total: f64,
    window_days: f64,
    params: &AnomalyParams,
) -> AnomalySignal {
    if baseline_totals.len() < params.min_baseline_points || baseline_totals.is_empty() {
        return AnomalySignal {
            ticker,
            current_shares_sold: current_total,
            baseline_mean: 0.0,
            baseline_std: 0.0,
            z_score: 0.0,
            is_anomaly: false,
        };
    }

    let (mean, std) = mean_std(baseline_totals);
    let std = if std <= 0.0 { STD_EPSILON } else { std };
    let z = (current_total / window_days - mean) / std;
    AnomalySignal {
        ticker,
        current_shares_sold: current_total,
        baseline_mean: mean,
        baseline_std: std,
        z_score: z,
        is_anomaly: z >= params.std_threshold && current_total > 0.0,
    }
}

/// Population mean and standard deviation (divides by N).
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sq_diff = values
        .iter()
        .map(|v| {
            let centered = v - mean;
            centered * centered
        })
        .sum::<f64>();
    (mean, (sq_diff / n).sqrt())
}

/// Descending z-score; ties broken by ticker for stable output.
pub(crate) fn sort_by_z(signals: &mut [AnomalySignal]) {
    signals.sort_by(|a, b| {
        b.z_score
            .partial_cmp(&a.z_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}
