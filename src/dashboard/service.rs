//! Serves the cached dashboard and keeps it fresh with debounced background builds.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::Settings,
    dashboard::{
        cache::{CacheState, DashboardCache},
        BuildOptions, MarketSnapshotBuilder, SnapshotBuilder,
    },
    error::{BuildError, ProviderError},
    models::DashboardSnapshot,
    signals::EngineSelector,
};

/// Result of one refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was built and cached.
    Written,
    /// Another refresh started within the debounce window.
    Skipped,
    /// Build or cache write failed; the previous snapshot stays authoritative.
    Failed,
}

/// What `dashboard()` hands back without waiting on a build.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Cached(DashboardSnapshot),
    Preparing,
}

pub struct DashboardService {
    cache: DashboardCache,
    builder: Arc<dyn SnapshotBuilder>,
    debounce: Duration,
    last_refresh: Arc<Mutex<Option<Instant>>>,
}

impl DashboardService {
    pub fn new(cache: DashboardCache, builder: Arc<dyn SnapshotBuilder>, debounce: Duration) -> Self {
        Self {
            cache,
            builder,
            debounce,
            last_refresh: Arc::new(Mutex::new(None)),
        }
    }

    /// Cache slot, builder and debounce window taken from `settings`.
    pub fn from_settings(settings: &Settings, engines: EngineSelector) -> Result<Self, ProviderError> {
        let builder = MarketSnapshotBuilder::from_settings(settings, engines)?;
        Ok(Self::new(
            DashboardCache::new(settings.cache_path(), settings.cache_max_age),
            Arc::new(builder),
            settings.refresh_debounce,
        ))
    }

    pub fn cache(&self) -> &DashboardCache {
        &self.cache
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.cache.cached_at()
    }

    /// Build and cache a full snapshot unless one started within the debounce window.
    ///
    /// Concurrent callers queue on the lock; all but the first observe `Skipped`.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let last = Arc::clone(&self.last_refresh).lock_owned().await;
        self.refresh_holding(last).await
    }

    /// Refresh regardless of the debounce window, still serialised with other refreshes.
    #[instrument(skip(self))]
    pub async fn force_refresh(&self) -> RefreshOutcome {
        let mut last = self.last_refresh.lock().await;
        *last = Some(Instant::now());
        self.build_and_store().await
    }

    /// Background refresh on the runtime, or `None` when a build already holds the lock.
    pub fn trigger_refresh(self: &Arc<Self>) -> Option<JoinHandle<RefreshOutcome>> {
        let last = match Arc::clone(&self.last_refresh).try_lock_owned() {
            Ok(last) => last,
            Err(_) => {
                debug!("refresh already running; request dropped");
                return None;
            }
        };
        let service = Arc::clone(self);
        Some(tokio::spawn(async move { service.refresh_holding(last).await }))
    }

    async fn refresh_holding(&self, mut last: OwnedMutexGuard<Option<Instant>>) -> RefreshOutcome {
        if let Some(started) = *last {
            if !self.debounce.is_zero() && started.elapsed() < self.debounce {
                info!(since = ?started.elapsed(), "refresh debounced");
                return RefreshOutcome::Skipped;
            }
        }
        *last = Some(Instant::now());
        self.build_and_store().await
    }

    /// Cached snapshot (possibly stale) or `Preparing`. Never waits on a build.
    pub fn dashboard(self: &Arc<Self>) -> DashboardView {
        let snapshot = self.cache.read(true);
        if self.cache.state() != CacheState::Fresh {
            self.trigger_refresh();
        }
        match snapshot {
            Some(snapshot) => DashboardView::Cached(snapshot),
            None => DashboardView::Preparing,
        }
    }

    /// Refresh on boot when the cache is empty or stale.
    pub async fn startup_refresh(&self) -> Option<RefreshOutcome> {
        match self.cache.state() {
            CacheState::Fresh => {
                info!("dashboard cache is fresh; skipping startup refresh");
                None
            }
            state => {
                info!(?state, "refreshing dashboard on startup");
                Some(self.refresh().await)
            }
        }
    }

    /// Filtered build served directly, bypassing the cache.
    pub async fn on_demand(
        &self,
        sector: Option<String>,
        limit: Option<usize>,
    ) -> Result<DashboardSnapshot, BuildError> {
        let opts = BuildOptions {
            sector,
            limit,
            as_of: today(),
        };
        self.builder.build(opts).await
    }

    async fn build_and_store(&self) -> RefreshOutcome {
        let started = Instant::now();
        let snapshot = match self.builder.build(BuildOptions::full(today())).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "dashboard build failed; keeping previous snapshot");
                return RefreshOutcome::Failed;
            }
        };
        match self.cache.write(&snapshot) {
            Ok(cached_at) => {
                info!(
                    %cached_at,
                    companies = snapshot.total_companies,
                    elapsed = ?started.elapsed(),
                    "dashboard refreshed"
                );
                RefreshOutcome::Written
            }
            Err(err) => {
                warn!(%err, "failed to write dashboard cache");
                RefreshOutcome::Failed
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
