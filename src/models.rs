//! Domain records shared by ingestion, signal computation and the dashboard.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One disclosed insider sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderSellRecord {
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub transaction_date: NaiveDate,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_date"
    )]
    pub filing_date: Option<NaiveDate>,
    pub shares_sold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<f64>,
    pub source: String,
}

impl InsiderSellRecord {
    /// Minimal record, used by tests and the engine protocol fixtures.
    pub fn new(ticker: &str, transaction_date: NaiveDate, shares_sold: f64, source: &str) -> Self {
        Self {
            ticker: ticker.trim().to_ascii_uppercase(),
            company_name: None,
            insider_name: None,
            role: None,
            transaction_date,
            filing_date: None,
            shares_sold,
            value_usd: None,
            source: source.to_string(),
        }
    }

    pub fn with_insider(mut self, name: &str) -> Self {
        self.insider_name = Some(name.to_string());
        self
    }
}

/// Parse the leading `YYYY-MM-DD` of a date or timestamp string.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub(crate) fn lenient_date<'de, D>(d: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse_day(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date {raw:?}")))
}

fn lenient_opt_date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(parse_day))
}

/// Per-ticker outcome of the anomaly computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySignal {
    pub ticker: String,
    pub current_shares_sold: f64,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
}

/// Quarter-over-quarter return and regression slope from a close series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyTrend {
    pub quarter_pct: f64,
    pub q_return: f64,
    pub slope: f64,
    pub last: f64,
}

/// Member of the ticker universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub symbol: String,
    pub name: String,
    pub sector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub url: String,
}

impl Headline {
    pub const MAX_TITLE_CHARS: usize = 80;

    /// Build a headline, truncating the title on a character boundary.
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.chars().take(Self::MAX_TITLE_CHARS).collect(),
            url: url.to_string(),
        }
    }
}

/// Which upstream served an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Fmp,
    Yahoo,
    None,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Source::Fmp => "fmp",
            Source::Yahoo => "yahoo",
            Source::None => "none",
        };
        f.write_str(label)
    }
}

/// Data categories subject to provider fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Quotes,
    History,
    News,
}

/// Why a category left its primary provider for the rest of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    RateLimited,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderSummary {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub shares: f64,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSources {
    pub price: Source,
    pub news: Source,
    pub insiders: Source,
}

/// One company line in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRow {
    pub symbol: String,
    pub name: String,
    pub price: Option<f64>,
    pub change_pct: Option<f64>,
    pub quarter_trend: Option<f64>,
    #[serde(default)]
    pub news: Vec<Headline>,
    #[serde(default)]
    pub top_insiders: Vec<InsiderSummary>,
    pub sources: RowSources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorGroup {
    pub name: String,
    pub companies: Vec<CompanyRow>,
}

/// The assembled dashboard payload held by the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub as_of: NaiveDate,
    pub total_companies: usize,
    pub sectors: Vec<SectorGroup>,
    pub available_sectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<BTreeMap<Category, ProviderState>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<AnomalySignal>,
    #[serde(
        rename = "_cached_at",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cached_at: Option<DateTime<Utc>>,
}
