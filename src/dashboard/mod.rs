//! Dashboard assembly: universe, quotes, insider activity, trends and headlines.

pub mod cache;
pub mod service;

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::{
    config::Settings,
    data::{
        aggregate::{Aggregator, TICKER_PACING},
        fallback::FallbackFetcher,
        fmp::FmpClient,
        universe::{UniverseClient, UNKNOWN_SECTOR},
        yahoo::{to_yahoo_symbol, YahooClient},
        MarketSource, UniverseSource,
    },
    error::{BuildError, ProviderError},
    models::{
        Category, Company, CompanyRow, DashboardSnapshot, InsiderSellRecord, InsiderSummary,
        Quote, RowSources, SectorGroup, Source,
    },
    signals::{
        clamp_baseline_days, clamp_current_days, clamp_threshold, trend, AnomalyParams,
        EngineSelector,
    },
};

const QUOTE_BATCH: usize = 100;
const INSIDER_LOOKBACK_DAYS: i64 = 365 + 30;
const HISTORY_LOOKBACK_DAYS: i64 = 92;
const HEADLINES_PER_COMPANY: usize = 2;
const TOP_INSIDERS: usize = 5;

/// Which slice of the universe a build covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub sector: Option<String>,
    pub limit: Option<usize>,
    pub as_of: NaiveDate,
}

impl BuildOptions {
    /// Whole universe with sampled trend/news coverage.
    pub fn full(as_of: NaiveDate) -> Self {
        Self {
            sector: None,
            limit: None,
            as_of,
        }
    }

    fn is_filtered(&self) -> bool {
        self.sector.is_some() || self.limit.is_some_and(|limit| limit > 0)
    }
}

#[async_trait]
pub trait SnapshotBuilder: Send + Sync {
    async fn build(&self, opts: BuildOptions) -> Result<DashboardSnapshot, BuildError>;
}

/// Sampling sizes and pacing for one builder.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub free_tier: bool,
    pub baseline_days: i64,
    pub current_days: i64,
    pub std_threshold: f64,
    pub min_baseline_points: usize,
    pub quote_pacing: Duration,
    pub symbol_pacing: Duration,
}

impl BuildSettings {
    /// Sizes from `settings`, with the anomaly window pulled into range.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            free_tier: settings.fmp_free_tier,
            baseline_days: clamp_baseline_days(settings.baseline_days),
            current_days: clamp_current_days(settings.current_days),
            std_threshold: clamp_threshold(settings.std_threshold),
            min_baseline_points: settings.min_baseline_points,
            quote_pacing: Duration::from_millis(150),
            symbol_pacing: Duration::from_millis(80),
        }
    }

    /// Same sizes without any sleeping between calls.
    pub fn unpaced(mut self) -> Self {
        self.quote_pacing = Duration::ZERO;
        self.symbol_pacing = Duration::ZERO;
        self
    }

    fn insider_sample(&self, tickers: usize) -> usize {
        let sample = if self.free_tier { 15 } else { 80 };
        sample.min(tickers)
    }

    fn trend_news_sample(&self, companies: usize) -> usize {
        let sample = if self.free_tier { 10 } else { 50 };
        sample.min(companies)
    }

    fn anomaly_params(&self, as_of: NaiveDate) -> AnomalyParams {
        AnomalyParams::new(
            self.baseline_days,
            self.current_days,
            self.std_threshold,
            as_of,
        )
        .with_min_baseline_points(self.min_baseline_points)
    }
}

pub struct MarketSnapshotBuilder {
    universe: Arc<dyn UniverseSource>,
    primary: Option<Arc<dyn MarketSource>>,
    secondary: Arc<dyn MarketSource>,
    insiders: Aggregator,
    engines: EngineSelector,
    config: BuildSettings,
}

impl MarketSnapshotBuilder {
    pub fn new(
        universe: Arc<dyn UniverseSource>,
        primary: Option<Arc<dyn MarketSource>>,
        secondary: Arc<dyn MarketSource>,
        insiders: Aggregator,
        engines: EngineSelector,
        config: BuildSettings,
    ) -> Self {
        Self {
            universe,
            primary,
            secondary,
            insiders,
            engines,
            config,
        }
    }

    /// Production wiring: S&P 500 CSV, FMP primary, Yahoo secondary.
    pub fn from_settings(settings: &Settings, engines: EngineSelector) -> Result<Self, ProviderError> {
        let fmp = Arc::new(FmpClient::from_settings(settings)?);
        let yahoo = Arc::new(YahooClient::new(settings.yahoo_base_url.clone())?);
        let universe = Arc::new(UniverseClient::new(settings.universe_csv_url.clone())?);
        // Free tier keeps FMP for insider data only.
        let primary: Option<Arc<dyn MarketSource>> = if settings.fmp_free_tier {
            None
        } else {
            Some(fmp.clone())
        };
        Ok(Self::new(
            universe,
            primary,
            yahoo,
            Aggregator::for_source(fmp, settings.fmp_free_tier).with_pacing(TICKER_PACING),
            engines,
            BuildSettings::from_settings(settings),
        ))
    }

    /// Quotes in batches of 100, keyed by both `BRK.B` and `BRK-B` forms.
    async fn fetch_quotes(
        &self,
        fetcher: &mut FallbackFetcher,
        tickers: &[String],
    ) -> (HashMap<String, Quote>, HashMap<String, Source>) {
        let mut quotes = HashMap::new();
        let mut served_by = HashMap::new();
        for (idx, batch) in tickers.chunks(QUOTE_BATCH).enumerate() {
            if idx > 0 {
                self.pace(self.config.quote_pacing).await;
            }
            let served = fetcher.quotes(batch).await;
            for symbol in batch {
                served_by.insert(symbol.clone(), served.source);
            }
            for quote in served.items {
                let symbol = quote.symbol.trim().to_string();
                let alt = to_yahoo_symbol(&symbol);
                if alt != symbol {
                    quotes.insert(alt, quote.clone());
                }
                quotes.insert(symbol, quote);
            }
        }
        debug!(tickers = tickers.len(), quotes = quotes.len(), "quotes fetched");
        (quotes, served_by)
    }

    async fn pace(&self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl SnapshotBuilder for MarketSnapshotBuilder {
    #[instrument(skip(self), fields(sector = ?opts.sector, limit = ?opts.limit, as_of = %opts.as_of))]
    async fn build(&self, opts: BuildOptions) -> Result<DashboardSnapshot, BuildError> {
        let universe = self
            .universe
            .companies()
            .await
            .map_err(|err| BuildError::Universe(err.to_string()))?;
        if universe.is_empty() {
            return Err(BuildError::Universe("universe is empty".to_string()));
        }

        let available_sectors = available_sectors(&universe);
        let companies = select_companies(universe, &opts);
        let tickers: Vec<String> = companies.iter().map(|c| c.symbol.clone()).collect();
        let mut fetcher = FallbackFetcher::new(self.primary.clone(), self.secondary.clone());

        // Quotes for every selected company while insider activity for the first
        // sample of tickers is aggregated.
        let insider_tickers = &tickers[..self.config.insider_sample(tickers.len())];
        let ((quotes, price_source), records) = futures::join!(
            self.fetch_quotes(&mut fetcher, &tickers),
            self.insiders.aggregate(
                insider_tickers,
                opts.as_of - ChronoDuration::days(INSIDER_LOOKBACK_DAYS),
                opts.as_of,
            )
        );
        let top_insiders = top_insiders_by_ticker(&records);

        // Trend and headlines for the companies on screen, or a sample of the universe.
        let sample = if opts.is_filtered() {
            companies.len()
        } else {
            self.config.trend_news_sample(companies.len())
        };
        let history_from = opts.as_of - ChronoDuration::days(HISTORY_LOOKBACK_DAYS);
        let mut trends: HashMap<String, f64> = HashMap::new();
        for company in &companies[..sample] {
            let served = fetcher.history(&company.symbol, history_from, opts.as_of).await;
            if let Some(closes) = trend::sorted_closes(&served.items) {
                if let Some(t) = self.engines.quarterly_trend(&closes).await {
                    trends.insert(company.symbol.clone(), t.quarter_pct);
                }
            }
            self.pace(self.config.symbol_pacing).await;
        }
        let mut headlines = HashMap::new();
        for company in &companies[..sample] {
            let served = fetcher.news(&company.symbol, HEADLINES_PER_COMPANY).await;
            let mut items = served.items;
            items.truncate(HEADLINES_PER_COMPANY);
            headlines.insert(company.symbol.clone(), (served.source, items));
            self.pace(self.config.symbol_pacing).await;
        }
        info!(sample, trends = trends.len(), "trends and headlines fetched");

        let anomalies = self
            .engines
            .compute_signals(&records, &self.config.anomaly_params(opts.as_of))
            .await;

        let fallback_source = fetcher.current_source(Category::Quotes);
        let mut by_sector: BTreeMap<String, Vec<CompanyRow>> = BTreeMap::new();
        for company in &companies {
            let symbol = &company.symbol;
            let quote = quotes.get(symbol);
            let (news_source, news) = headlines.remove(symbol).unwrap_or((Source::None, Vec::new()));
            let insiders = top_insiders
                .get(&symbol.to_ascii_uppercase())
                .cloned()
                .unwrap_or_default();
            let row = CompanyRow {
                symbol: symbol.clone(),
                name: company.name.clone(),
                price: quote.map(|q| q.price).filter(|p| *p > 0.0),
                change_pct: quote.map(|q| q.change_pct).filter(|c| *c != 0.0),
                quarter_trend: trends.get(symbol).copied(),
                sources: RowSources {
                    price: price_source.get(symbol).copied().unwrap_or(fallback_source),
                    news: if news.is_empty() { Source::None } else { news_source },
                    insiders: if insiders.is_empty() { Source::None } else { Source::Fmp },
                },
                news,
                top_insiders: insiders,
            };
            by_sector
                .entry(sector_name(company).to_string())
                .or_default()
                .push(row);
        }

        Ok(DashboardSnapshot {
            as_of: opts.as_of,
            total_companies: companies.len(),
            sectors: by_sector
                .into_iter()
                .map(|(name, companies)| SectorGroup { name, companies })
                .collect(),
            available_sectors,
            provider_status: fetcher.into_status(),
            anomalies,
            cached_at: None,
        })
    }
}

fn sector_name(company: &Company) -> &str {
    let sector = company.sector.trim();
    if sector.is_empty() {
        UNKNOWN_SECTOR
    } else {
        sector
    }
}

/// Distinct sector names across the whole universe, sorted.
pub fn available_sectors(universe: &[Company]) -> Vec<String> {
    let mut sectors: Vec<String> = universe.iter().map(|c| sector_name(c).to_string()).collect();
    sectors.sort();
    sectors.dedup();
    sectors
}

/// Filter by sector (case-insensitive) first, then apply the limit.
pub fn select_companies(universe: Vec<Company>, opts: &BuildOptions) -> Vec<Company> {
    let mut companies: Vec<Company> = match &opts.sector {
        Some(sector) => universe
            .into_iter()
            .filter(|c| sector_name(c).eq_ignore_ascii_case(sector.trim()))
            .collect(),
        None => universe,
    };
    if let Some(limit) = opts.limit.filter(|limit| *limit > 0) {
        companies.truncate(limit);
    }
    companies
}

/// Largest sells per ticker, at most five, by shares descending.
pub fn top_insiders_by_ticker(records: &[InsiderSellRecord]) -> HashMap<String, Vec<InsiderSummary>> {
    let mut by_ticker: HashMap<String, Vec<InsiderSummary>> = HashMap::new();
    for record in records {
        by_ticker
            .entry(record.ticker.to_ascii_uppercase())
            .or_default()
            .push(InsiderSummary {
                name: record
                    .insider_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                role: record.role.clone(),
                shares: record.shares_sold,
                value: record.value_usd,
            });
    }
    for summaries in by_ticker.values_mut() {
        summaries.sort_by(|a, b| b.shares.total_cmp(&a.shares));
        summaries.truncate(TOP_INSIDERS);
    }
    by_ticker
}
