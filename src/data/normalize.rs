//! Normalisation of raw insider-transaction payloads into sell records.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{parse_day, InsiderSellRecord};

const DEFAULT_SHARE_FIELDS: &[&str] = &["securitiesTransacted", "numberOfShares", "shares"];

/// Ordered vendor field names tried for a share count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFields(Vec<String>);

impl Default for ShareFields {
    fn default() -> Self {
        Self(DEFAULT_SHARE_FIELDS.iter().map(|f| f.to_string()).collect())
    }
}

impl ShareFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Parse a comma separated list such as `numberOfShares,shares`.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First field carrying a non-zero number; 0 when none does.
    pub fn extract(&self, fields: &Map<String, Value>) -> f64 {
        self.0
            .iter()
            .filter_map(|name| fields.get(name).and_then(number))
            .find(|v| *v != 0.0)
            .unwrap_or(0.0)
    }
}

/// One insider transaction as a disclosure provider returns it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default)]
    pub symbol: Option<Value>,
    #[serde(default)]
    pub ticker: Option<Value>,
    #[serde(default)]
    pub transaction_type: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<Value>,
    #[serde(default)]
    pub acquisition_or_disposition: Option<Value>,
    #[serde(default)]
    pub acquired_disposed_code: Option<Value>,
    #[serde(default)]
    pub transaction_date: Option<Value>,
    #[serde(default)]
    pub period_of_report: Option<Value>,
    #[serde(default)]
    pub filing_date: Option<Value>,
    #[serde(default)]
    pub filed_at: Option<Value>,
    #[serde(default)]
    pub company_name: Option<Value>,
    #[serde(default)]
    pub reporting_name: Option<Value>,
    #[serde(default)]
    pub reporting_owner: Option<Value>,
    #[serde(default)]
    pub type_of_owner: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub value_usd: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    /// Everything else, including the share-count variants.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawTransaction {
    /// Sale heuristics over transaction-type and disposition codes.
    pub fn is_sell(&self) -> bool {
        let disposition = [&self.acquisition_or_disposition, &self.acquired_disposed_code]
            .into_iter()
            .filter_map(|v| v.as_ref().and_then(text))
            .any(|code| code.eq_ignore_ascii_case("D"));

        disposition
            || [&self.transaction_type, &self.kind]
                .into_iter()
                .filter_map(|v| v.as_ref().and_then(text))
                .any(|code| {
                    code.eq_ignore_ascii_case("S")
                        || code.eq_ignore_ascii_case("D")
                        || code.to_ascii_lowercase().contains("sale")
                })
    }

    /// Convert into a sell record, applying the ingestion invariants.
    pub fn into_record(
        self,
        requested_ticker: Option<&str>,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        share_fields: &ShareFields,
        source: &str,
    ) -> Option<InsiderSellRecord> {
        if !self.is_sell() {
            return None;
        }
        let ticker = first_text([&self.symbol, &self.ticker])
            .or_else(|| requested_ticker.map(str::to_string))
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())?;

        let transaction_date = first_text([
            &self.transaction_date,
            &self.period_of_report,
            &self.filing_date,
        ])
        .as_deref()
        .and_then(parse_day)?;
        if date_from.is_some_and(|from| transaction_date < from)
            || date_to.is_some_and(|to| transaction_date > to)
        {
            return None;
        }

        let shares = share_fields.extract(&self.extra);
        if shares <= 0.0 || !shares.is_finite() {
            return None;
        }

        let value_usd = [&self.value, &self.value_usd]
            .into_iter()
            .filter_map(|v| v.as_ref().and_then(number))
            .find(|v| *v > 0.0)
            .or_else(|| {
                self.price
                    .as_ref()
                    .and_then(number)
                    .filter(|p| *p > 0.0)
                    .map(|p| p * shares)
            });

        Some(InsiderSellRecord {
            ticker,
            company_name: first_text([&self.company_name]),
            insider_name: first_text([&self.reporting_name, &self.reporting_owner]),
            role: first_text([&self.type_of_owner]),
            transaction_date,
            filing_date: first_text([&self.filing_date, &self.filed_at])
                .as_deref()
                .and_then(parse_day),
            shares_sold: shares,
            value_usd,
            source: source.to_string(),
        })
    }
}

/// Normalise a batch, dropping everything that is not a valid sale.
pub fn sells_from_raw(
    raw: Vec<RawTransaction>,
    requested_ticker: Option<&str>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    share_fields: &ShareFields,
    source: &str,
) -> Vec<InsiderSellRecord> {
    raw.into_iter()
        .filter_map(|tx| tx.into_record(requested_ticker, date_from, date_to, share_fields, source))
        .collect()
}

/// Strings, or the `name` of an object such as `{"name": "Jane Doe"}`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map.get("name").and_then(text),
        _ => None,
    }
}

fn first_text<const N: usize>(values: [&Option<Value>; N]) -> Option<String> {
    values
        .into_iter()
        .filter_map(|v| v.as_ref().and_then(text))
        .next()
}

/// Numbers or numeric strings such as `"1,250"`.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}
