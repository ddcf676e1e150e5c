//! Drive the disclosure providers over a ticker universe and merge their batches.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    data::{dedup::Deduplicator, InsiderSource},
    models::InsiderSellRecord,
};

/// Per-ticker calls allowed on a free provider tier.
pub const FREE_TIER_TICKER_CAP: usize = 25;

/// Delay between per-ticker calls against a live provider.
pub const TICKER_PACING: Duration = Duration::from_millis(80);

pub struct Aggregator {
    sources: Vec<Arc<dyn InsiderSource>>,
    ticker_cap: Option<usize>,
    include_latest: bool,
    pacing: Duration,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn InsiderSource>>) -> Self {
        Self {
            sources,
            ticker_cap: None,
            include_latest: true,
            pacing: Duration::ZERO,
        }
    }

    /// Aggregator over a single source, capped when on a free tier.
    pub fn for_source(source: Arc<dyn InsiderSource>, free_tier: bool) -> Self {
        let aggregator = Self::new(vec![source]);
        if free_tier {
            aggregator.with_ticker_cap(FREE_TIER_TICKER_CAP)
        } else {
            aggregator
        }
    }

    /// Only the first `cap` tickers are fetched individually.
    pub fn with_ticker_cap(mut self, cap: usize) -> Self {
        self.ticker_cap = Some(cap);
        self
    }

    /// Skip the unscoped "latest filings" fetch.
    pub fn without_latest(mut self) -> Self {
        self.include_latest = false;
        self
    }

    /// Delay between consecutive per-ticker calls.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Fetch, normalise and de-duplicate sells for `tickers` in `[date_from, date_to]`.
    ///
    /// An empty result means "no data available"; provider failures never abort
    /// the aggregation.
    pub async fn aggregate(
        &self,
        tickers: &[String],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Vec<InsiderSellRecord> {
        let mut merged = Deduplicator::new();
        let limit = self
            .ticker_cap
            .map_or(tickers.len(), |cap| cap.min(tickers.len()));

        for source in &self.sources {
            if !source.is_configured() {
                debug!(source = source.name(), "insider source not configured; skipping");
                continue;
            }
            for (idx, ticker) in tickers[..limit].iter().enumerate() {
                if idx > 0 && !self.pacing.is_zero() {
                    sleep(self.pacing).await;
                }
                let batch = fetch(source.as_ref(), Some(ticker), date_from, date_to).await;
                merged.extend(batch);
            }
            if self.include_latest {
                let batch = fetch(source.as_ref(), None, date_from, date_to).await;
                let added = merged.extend(batch);
                debug!(source = source.name(), added, "merged latest filings");
            }
        }

        info!(
            tickers = limit,
            records = merged.len(),
            %date_from,
            %date_to,
            "aggregated insider sells"
        );
        merged.finish()
    }
}

async fn fetch(
    source: &dyn InsiderSource,
    ticker: Option<&String>,
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Vec<InsiderSellRecord> {
    match source
        .insider_sells(ticker.map(String::as_str), date_from, date_to)
        .await
    {
        Ok(records) => records,
        Err(err) => {
            warn!(source = source.name(), ?ticker, %err, "insider fetch failed");
            Vec::new()
        }
    }
}
