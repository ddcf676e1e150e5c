//! Financial Modeling Prep client: insider trades, quotes, history, news.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::Settings,
    data::{
        http::{default_user_agent, http_client},
        normalize::{sells_from_raw, RawTransaction, ShareFields},
        InsiderSource, MarketSource,
    },
    error::ProviderError,
    models::{parse_day, Headline, InsiderSellRecord, PricePoint, Quote, Source},
};

const PROVIDER: &str = "fmp";
const PAGE_LIMIT: &str = "100";
const MAX_QUOTE_SYMBOLS: usize = 100;

#[derive(Debug, Clone)]
pub struct FmpClient {
    http: Client,
    base_url: String,
    api_key: String,
    share_fields: ShareFields,
}

impl FmpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        share_fields: ShareFields,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(&default_user_agent())?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            share_fields,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ProviderError> {
        Self::new(
            settings.fmp_base_url.clone(),
            settings.fmp_api_key.clone(),
            settings.share_fields.clone(),
        )
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured { provider: PROVIDER });
        }
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited { provider: PROVIDER });
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let payload: Value = resp.json().await?;
        if let Some(message) = payload.get("Error Message").and_then(Value::as_str) {
            if message.to_ascii_lowercase().contains("limit") {
                return Err(ProviderError::RateLimited { provider: PROVIDER });
            }
            return Err(ProviderError::Api {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }
        Ok(payload)
    }
}

#[async_trait]
impl InsiderSource for FmpClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn insider_sells(
        &self,
        ticker: Option<&str>,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<InsiderSellRecord>, ProviderError> {
        let ticker = ticker.map(str::trim).filter(|t| !t.is_empty());
        let mut params = vec![("page", "0".to_string()), ("limit", PAGE_LIMIT.to_string())];
        let path = match ticker {
            Some(symbol) => {
                params.push(("symbol", symbol.to_string()));
                "/insider-trading/search"
            }
            None => "/insider-trading/latest",
        };
        let payload = self.get(path, &params).await?;
        let raw: Vec<RawTransaction> = parse_items(payload, &["data", "insider_trading"]);
        let total = raw.len();
        let sells = sells_from_raw(
            raw,
            ticker,
            Some(date_from),
            Some(date_to),
            &self.share_fields,
            PROVIDER,
        );
        debug!(?ticker, total, sells = sells.len(), "fmp insider trades");
        Ok(sells)
    }
}

#[async_trait]
impl MarketSource for FmpClient {
    fn source(&self) -> Source {
        Source::Fmp
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ProviderError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let joined = symbols
            .iter()
            .take(MAX_QUOTE_SYMBOLS)
            .map(|s| s.trim().chars().take(10).collect::<String>())
            .collect::<Vec<_>>()
            .join(",");
        let payload = self.get("/quote", &[("symbol", joined)]).await?;
        let rows: Vec<FmpQuote> = parse_items(payload, &[]);
        Ok(rows
            .into_iter()
            .filter_map(|q| {
                Some(Quote {
                    symbol: q.symbol?.trim().to_string(),
                    price: q.price.unwrap_or_default(),
                    change_pct: q.changes_percentage.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn history(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        if symbol.trim().is_empty() {
            return Ok(Vec::new());
        }
        let params = [
            ("symbol", symbol.trim().to_string()),
            ("from", date_from.format("%Y-%m-%d").to_string()),
            ("to", date_to.format("%Y-%m-%d").to_string()),
        ];
        let payload = self.get("/historical-price-eod/full", &params).await?;
        let rows: Vec<FmpBar> = parse_items(payload, &["historical"]);
        Ok(rows
            .into_iter()
            .filter_map(|bar| {
                Some(PricePoint {
                    date: parse_day(bar.date.as_deref()?)?,
                    close: bar.close?,
                })
            })
            .collect())
    }

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>, ProviderError> {
        if symbol.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let params = [
            ("symbols", symbol.trim().to_string()),
            ("limit", limit.to_string()),
        ];
        let payload = self.get("/news/stock", &params).await?;
        let rows: Vec<FmpArticle> = parse_items(payload, &[]);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|a| {
                let url = a.url.or(a.link).unwrap_or_default();
                let title = a.title.unwrap_or_else(|| url.clone());
                Headline::new(&title, &url)
            })
            .collect())
    }
}

/// Items from a bare array, or from the first listed key holding one.
fn parse_items<T: for<'de> Deserialize<'de>>(payload: Value, keys: &[&str]) -> Vec<T> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) if !items.is_empty() => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(%err, "skipping malformed fmp item");
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    symbol: Option<String>,
    price: Option<f64>,
    #[serde(alias = "changePercentage")]
    changes_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FmpBar {
    date: Option<String>,
    #[serde(alias = "Close")]
    close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FmpArticle {
    title: Option<String>,
    url: Option<String>,
    link: Option<String>,
}
