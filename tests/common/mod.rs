//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use insider_pulse::{
    data::{InsiderSource, MarketSource, UniverseSource},
    error::ProviderError,
    models::{
        Company, DashboardSnapshot, Headline, InsiderSellRecord, PricePoint, Quote, Source,
    },
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn snapshot(as_of: NaiveDate) -> DashboardSnapshot {
    DashboardSnapshot {
        as_of,
        total_companies: 0,
        sectors: Vec::new(),
        available_sectors: vec!["Energy".to_string()],
        provider_status: None,
        anomalies: Vec::new(),
        cached_at: None,
    }
}

/// How a scripted market source answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Serve,
    Empty,
    Fail,
}

/// Market source with a fixed behaviour and per-category call counters.
pub struct ScriptedMarket {
    pub source: Source,
    pub configured: bool,
    pub behaviour: Behaviour,
    pub quote_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub news_calls: AtomicUsize,
}

impl ScriptedMarket {
    pub fn new(source: Source, behaviour: Behaviour) -> Self {
        Self {
            source,
            configured: true,
            behaviour,
            quote_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            news_calls: AtomicUsize::new(0),
        }
    }

    pub fn unconfigured(source: Source) -> Self {
        Self {
            configured: false,
            ..Self::new(source, Behaviour::Serve)
        }
    }

    fn answer<T>(&self, items: Vec<T>) -> Result<Vec<T>, ProviderError> {
        match self.behaviour {
            Behaviour::Serve => Ok(items),
            Behaviour::Empty => Ok(Vec::new()),
            Behaviour::Fail => Err(ProviderError::Status {
                status: 500,
                url: "http://mock".to_string(),
            }),
        }
    }
}

#[async_trait]
impl MarketSource for ScriptedMarket {
    fn source(&self) -> Source {
        self.source
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ProviderError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(
            symbols
                .iter()
                .map(|s| Quote {
                    symbol: s.clone(),
                    price: 100.0,
                    change_pct: 1.5,
                })
                .collect(),
        )
    }

    async fn history(
        &self,
        _symbol: &str,
        date_from: NaiveDate,
        _date_to: NaiveDate,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(
            (0..60)
                .map(|i| PricePoint {
                    date: date_from + chrono::Duration::days(i),
                    close: 100.0 + i as f64,
                })
                .collect(),
        )
    }

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>, ProviderError> {
        self.news_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(
            (0..limit + 1)
                .map(|i| Headline::new(&format!("{symbol} headline {i}"), "https://example.com"))
                .collect(),
        )
    }
}

/// Insider source replaying fixed batches and recording requested tickers.
pub struct ScriptedInsiders {
    pub configured: bool,
    pub per_ticker: Vec<InsiderSellRecord>,
    pub latest: Vec<InsiderSellRecord>,
    pub fail_for: Option<String>,
    pub requested: Mutex<Vec<Option<String>>>,
}

impl ScriptedInsiders {
    pub fn new(per_ticker: Vec<InsiderSellRecord>, latest: Vec<InsiderSellRecord>) -> Self {
        Self {
            configured: true,
            per_ticker,
            latest,
            fail_for: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<Option<String>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsiderSource for ScriptedInsiders {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn insider_sells(
        &self,
        ticker: Option<&str>,
        _date_from: NaiveDate,
        _date_to: NaiveDate,
    ) -> Result<Vec<InsiderSellRecord>, ProviderError> {
        self.requested
            .lock()
            .unwrap()
            .push(ticker.map(str::to_string));
        match ticker {
            Some(t) if self.fail_for.as_deref() == Some(t) => {
                Err(ProviderError::RateLimited { provider: "scripted" })
            }
            Some(t) => Ok(self
                .per_ticker
                .iter()
                .filter(|r| r.ticker == t)
                .cloned()
                .collect()),
            None => Ok(self.latest.clone()),
        }
    }
}

pub struct StaticUniverse(pub Vec<Company>);

#[async_trait]
impl UniverseSource for StaticUniverse {
    async fn companies(&self) -> Result<Vec<Company>, ProviderError> {
        Ok(self.0.clone())
    }
}

pub fn company(symbol: &str, sector: &str) -> Company {
    Company {
        symbol: symbol.to_string(),
        name: format!("{symbol} Inc."),
        sector: sector.to_string(),
    }
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
