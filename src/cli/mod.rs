//! Command-line interface wiring for insider-pulse.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod refresh;
pub mod scan;
pub mod serve;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Anomalous insider selling tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::run(args, settings).await,
            Commands::Scan(args) => scan::run(args, settings).await,
            Commands::Refresh => refresh::run(settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the JSON API.
    Serve(serve::Args),
    /// Score insider selling across the universe and print anomalies.
    Scan(scan::Args),
    /// Build the dashboard snapshot and write it to the cache.
    Refresh,
}
