//! Structured logging bootstrap using `tracing`.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Where formatted events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Keeps stdout free for protocol payloads (the engine binary).
    Stderr,
}

/// Install a global tracing subscriber with sensible defaults.
pub fn init_tracing() -> Result<()> {
    init_tracing_to(LogTarget::Stdout, "info")
}

/// Install a subscriber writing to `target`, filtered by `RUST_LOG` or `default_filter`.
pub fn init_tracing_to(target: LogTarget, default_filter: &str) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    let timer = fmt::time::UtcTime::rfc_3339();

    let layer = fmt::layer()
        .with_target(true)
        .with_timer(timer)
        .with_level(true)
        .with_line_number(true)
        .with_file(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    match target {
        LogTarget::Stdout => tracing_subscriber::registry()
            .with(layer.with_filter(env_filter))
            .try_init()?,
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(
                layer
                    .with_ansi(false)
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter),
            )
            .try_init()?,
    }

    tracing::debug!(?target, "tracing initialised");
    Ok(())
}
