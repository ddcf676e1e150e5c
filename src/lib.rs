//! Anomalous insider-selling detection over the S&P 500 with a cached market dashboard.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub mod scan;
pub mod signals;
