//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::Client;

use crate::error::ProviderError;

/// Yahoo rejects generic clients with 401/429.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client with timeout, compression and connection reuse.
pub fn http_client(user_agent: &str) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .brotli(true)
        .build()?)
}

pub fn default_user_agent() -> String {
    format!("insider-pulse/{}", env!("CARGO_PKG_VERSION"))
}
