//! S&P 500 universe loaded from the public constituents CSV.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::{
    data::{
        http::{default_user_agent, http_client},
        UniverseSource,
    },
    error::ProviderError,
    models::Company,
};

pub const UNKNOWN_SECTOR: &str = "Unknown";

/// GICS sectors accepted as dashboard filters.
pub const KNOWN_SECTORS: &[&str] = &[
    "Communication Services",
    "Consumer Discretionary",
    "Consumer Staples",
    "Energy",
    "Financials",
    "Health Care",
    "Industrials",
    "Information Technology",
    "Materials",
    "Real Estate",
    "Utilities",
    UNKNOWN_SECTOR,
];

pub fn is_known_sector(sector: &str) -> bool {
    KNOWN_SECTORS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(sector.trim()))
}

#[derive(Debug, Clone)]
pub struct UniverseClient {
    http: Client,
    csv_url: String,
}

impl UniverseClient {
    pub fn new(csv_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(&default_user_agent())?,
            csv_url: csv_url.into(),
        })
    }
}

#[async_trait]
impl UniverseSource for UniverseClient {
    async fn companies(&self) -> Result<Vec<Company>, ProviderError> {
        let resp = self.http.get(&self.csv_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: self.csv_url.clone(),
            });
        }
        let body = resp.text().await?;
        let companies = parse_constituents(&body)?;
        info!(count = companies.len(), "loaded ticker universe");
        Ok(companies)
    }
}

/// Parse a constituents CSV with `Symbol`, `Security` and `GICS Sector` columns.
pub fn parse_constituents(body: &str) -> Result<Vec<Company>, ProviderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ProviderError::Data(e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let symbol_idx =
        column("symbol").ok_or_else(|| ProviderError::Data("missing Symbol column".into()))?;
    let name_idx = column("security");
    let sector_idx = column("gics sector");

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ProviderError::Data(e.to_string()))?;
        let Some(symbol) = row.get(symbol_idx).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if !seen.insert(symbol.to_string()) {
            continue;
        }
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        out.push(Company {
            symbol: symbol.to_string(),
            name: cell(name_idx).unwrap_or_default(),
            sector: cell(sector_idx).unwrap_or_else(|| UNKNOWN_SECTOR.to_string()),
        });
    }
    Ok(out)
}
