//! CLI entry-point for prepopulating the dashboard cache.

use anyhow::{bail, Result};
use tracing::{info, instrument};

use crate::{
    config::Settings,
    dashboard::service::{DashboardService, RefreshOutcome},
    signals::EngineSelector,
};

#[instrument(skip(settings))]
pub async fn run(settings: Settings) -> Result<()> {
    let engines = EngineSelector::detect(&settings);
    let service = DashboardService::from_settings(&settings, engines)?;
    match service.force_refresh().await {
        RefreshOutcome::Written => {
            info!(path = %service.cache().path().display(), "dashboard cache written");
            println!("Wrote {}", service.cache().path().display());
            Ok(())
        }
        outcome => bail!("dashboard refresh did not complete ({outcome:?})"),
    }
}
