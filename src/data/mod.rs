//! Data ingestion layer: provider clients, normalisation, de-duplication and fallback.

pub mod aggregate;
pub mod dedup;
pub mod fallback;
pub mod fmp;
pub mod http;
pub mod normalize;
pub mod universe;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::ProviderError,
    models::{Company, Headline, InsiderSellRecord, PricePoint, Quote, Source},
};

/// A provider of insider-sell disclosures.
#[async_trait]
pub trait InsiderSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// False when credentials are missing; the aggregator skips the source.
    fn is_configured(&self) -> bool;

    /// Sells for `ticker`, or the latest filings across all symbols when `None`.
    async fn insider_sells(
        &self,
        ticker: Option<&str>,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<InsiderSellRecord>, ProviderError>;
}

/// A provider of quotes, close history and headlines.
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn source(&self) -> Source;

    fn is_configured(&self) -> bool;

    /// Quotes for up to 100 symbols.
    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ProviderError>;

    async fn history(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<PricePoint>, ProviderError>;

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>, ProviderError>;
}

/// The ticker universe.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    async fn companies(&self) -> Result<Vec<Company>, ProviderError>;
}
