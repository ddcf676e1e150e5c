//! Error taxonomy for the ingestion, engine, cache and build layers.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to an upstream data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider {provider} is not configured")]
    NotConfigured { provider: &'static str },

    #[error("rate limited by {provider}")]
    RateLimited { provider: &'static str },

    #[error("unexpected response status {status} at {url}")]
    Status { status: u16, url: String },

    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("malformed payload: {0}")]
    Data(String),
}

/// Failures of the accelerated statistics engine. Always recovered locally.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("accelerated engine not available")]
    Unavailable,

    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("engine exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("malformed engine payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reading or writing the dashboard cache slot.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialisation error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A dashboard build that must not be written to the cache.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("could not load the ticker universe: {0}")]
    Universe(String),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("could not load the ticker universe: {0}")]
    Universe(String),
}
