//! CLI entry-point for a one-shot anomaly scan.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    models::AnomalySignal,
    scan::{today, ScanReport, ScanRequest, Scanner},
    signals::EngineSelector,
};

/// Args for the `scan` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Days of history for the baseline window.
    #[arg(long)]
    pub baseline_days: Option<i64>,
    /// Length of the current window in days.
    #[arg(long)]
    pub current_days: Option<i64>,
    /// Z-score at or above which selling is anomalous.
    #[arg(long)]
    pub std_threshold: Option<f64>,
    /// Evaluation date, YYYY-MM-DD (defaults to today).
    #[arg(long)]
    pub as_of: Option<String>,
    /// Maximum tickers to scan; 0 scans the whole universe.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Print every ticker's signal, not just anomalies.
    #[arg(long)]
    pub list_all_signals: bool,
    /// Also write the printed signals to this CSV file.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let request = ScanRequest {
        limit: args.limit,
        baseline_days: args.baseline_days,
        current_days: args.current_days,
        std_threshold: args.std_threshold,
        as_of: args.as_of.clone(),
    };
    let params = request.resolve(&settings, today());
    let scanner = Scanner::from_settings(&settings, EngineSelector::detect(&settings))?;
    let report = scanner.run_scan(&params).await?;

    println!(
        "Scanned {} tickers, {} insider sell records from {} to {}.",
        report.tickers_count, report.records_count, report.date_from, report.date_to
    );
    let rows = selected(&report, args.list_all_signals);
    if args.list_all_signals {
        println!("\nAll signals (current window vs baseline):");
        if rows.is_empty() {
            println!("  (No data)");
        }
    } else {
        println!("\nAnomalous insider selling (above normal):");
        if rows.is_empty() {
            println!("  None detected.");
        }
    }
    for signal in &rows {
        println!("  {}", format_signal(signal, args.list_all_signals));
    }

    if let Some(path) = &args.csv {
        write_csv(path, &rows).with_context(|| format!("writing {}", path.display()))?;
        info!(rows = rows.len(), path = %path.display(), "wrote scan csv");
        println!("\nWrote {}.", path.display());
    }
    Ok(())
}

fn selected(report: &ScanReport, all: bool) -> Vec<&AnomalySignal> {
    if all {
        report.all_signals.iter().collect()
    } else {
        report.anomalies.iter().collect()
    }
}

fn format_signal(signal: &AnomalySignal, with_flag: bool) -> String {
    let mut line = format!(
        "{}  current={:.0}  mean={:.1}  std={:.1}  z={:.2}",
        signal.ticker,
        signal.current_shares_sold,
        signal.baseline_mean,
        signal.baseline_std,
        signal.z_score
    );
    if with_flag {
        line.push_str(&format!("  anomaly={}", signal.is_anomaly));
    }
    line
}

/// Write signals with the fixed `ticker,current_shares_sold,...` header.
pub fn write_csv(path: &std::path::Path, signals: &[&AnomalySignal]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "ticker",
        "current_shares_sold",
        "baseline_mean",
        "baseline_std",
        "z_score",
        "is_anomaly",
    ])?;
    for signal in signals {
        writer.write_record([
            signal.ticker.clone(),
            format!("{:.0}", signal.current_shares_sold),
            format!("{:.2}", signal.baseline_mean),
            format!("{:.2}", signal.baseline_std),
            format!("{:.2}", signal.z_score),
            signal.is_anomaly.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
