//! Yahoo Finance HTTP client used as the secondary market-data source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use urlencoding::encode;

use crate::{
    data::{
        http::{http_client, BROWSER_USER_AGENT},
        MarketSource,
    },
    error::ProviderError,
    models::{Headline, PricePoint, Quote, Source},
};

const PROVIDER: &str = "yahoo";
const MAX_QUOTE_SYMBOLS: usize = 100;
const MAX_NEWS: usize = 10;

/// Index symbols use a dot, Yahoo uses a dash: `BRK.B` -> `BRK-B`.
pub fn to_yahoo_symbol(symbol: &str) -> String {
    symbol.trim().replace('.', "-")
}

/// Inverse of [`to_yahoo_symbol`].
pub fn from_yahoo_symbol(symbol: &str) -> String {
    symbol.trim().replace('-', ".")
}

#[derive(Debug, Clone)]
pub struct YahooClient {
    http: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(BROWSER_USER_AGENT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(&url).query(params).send().await?;
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
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl MarketSource for YahooClient {
    fn source(&self) -> Source {
        Source::Yahoo
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ProviderError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let joined = symbols
            .iter()
            .take(MAX_QUOTE_SYMBOLS)
            .map(|s| to_yahoo_symbol(s))
            .collect::<Vec<_>>()
            .join(",");
        let payload: QuoteEnvelope = self.get("/v7/finance/quote", &[("symbols", joined)]).await?;
        Ok(payload
            .quote_response
            .result
            .into_iter()
            .filter_map(|row| {
                let symbol = from_yahoo_symbol(&row.symbol?);
                let previous = row.previous_close.unwrap_or_default();
                let price = row.regular_market_price.unwrap_or(previous);
                let change_pct = match row.regular_market_change_percent {
                    Some(pct) => pct,
                    None if previous > 0.0 => (price - previous) / previous * 100.0,
                    None => 0.0,
                };
                Some(Quote {
                    symbol,
                    price,
                    change_pct,
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
        let period = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or_default()
                .to_string()
        };
        let path = format!("/v8/finance/chart/{}", encode(&to_yahoo_symbol(symbol)));
        let params = [
            ("interval", "1d".to_string()),
            ("period1", period(date_from)),
            ("period2", period(date_to)),
        ];
        let payload: ChartEnvelope = self.get(&path, &params).await?;
        let Some(result) = payload.chart.result.into_iter().flatten().next() else {
            return Ok(Vec::new());
        };
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();
        Ok(result
            .timestamp
            .into_iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                Some(PricePoint {
                    date: DateTime::from_timestamp(ts, 0)?.date_naive(),
                    close: close?,
                })
            })
            .collect())
    }

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>, ProviderError> {
        if symbol.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let count = limit.min(MAX_NEWS);
        let params = [
            ("q", to_yahoo_symbol(symbol)),
            ("quotesCount", "0".to_string()),
            ("newsCount", count.to_string()),
        ];
        let payload: SearchEnvelope = self.get("/v1/finance/search", &params).await?;
        Ok(payload
            .news
            .into_iter()
            .take(limit)
            .map(|item| Headline::new(&item.title, &item.link))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuote {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    regular_market_change_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchNews {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
}
