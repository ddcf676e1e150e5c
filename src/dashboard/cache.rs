//! Single-slot JSON cache for the assembled dashboard.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{error::CacheError, models::DashboardSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

#[derive(Debug, Clone)]
pub struct DashboardCache {
    path: PathBuf,
    max_age: Duration,
}

impl DashboardCache {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self, allow_stale: bool) -> Option<DashboardSnapshot> {
        self.read_at(allow_stale, Utc::now())
    }

    /// The cached snapshot as seen at `now`.
    ///
    /// Missing, unreadable or unstamped slots read as empty. A stale slot is
    /// returned only with `allow_stale`.
    pub fn read_at(&self, allow_stale: bool, now: DateTime<Utc>) -> Option<DashboardSnapshot> {
        let snapshot = self.load()?;
        let cached_at = snapshot.cached_at?;
        if !allow_stale && !self.is_fresh(cached_at, now) {
            debug!(%cached_at, "dashboard cache is stale");
            return None;
        }
        Some(snapshot)
    }

    pub fn write(&self, snapshot: &DashboardSnapshot) -> Result<DateTime<Utc>, CacheError> {
        self.write_at(snapshot, Utc::now())
    }

    /// Stamp `snapshot` with `now` and atomically replace the slot.
    pub fn write_at(
        &self,
        snapshot: &DashboardSnapshot,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, CacheError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;

        let mut stamped = snapshot.clone();
        stamped.cached_at = Some(now);
        let body = serde_json::to_vec(&stamped)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| self.io_error(source))?;
        tmp.write_all(&body)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| self.io_error(source))?;
        tmp.persist(&self.path)
            .map_err(|err| self.io_error(err.error))?;

        debug!(path = %self.path.display(), bytes = body.len(), "dashboard cache written");
        Ok(now)
    }

    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.load().and_then(|snapshot| snapshot.cached_at)
    }

    pub fn state(&self) -> CacheState {
        self.state_at(Utc::now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CacheState {
        match self.cached_at() {
            None => CacheState::Empty,
            Some(cached_at) if self.is_fresh(cached_at, now) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - cached_at).to_std() {
            Ok(age) => age <= self.max_age,
            // Stamped in the future (clock skew): treat as just written.
            Err(_) => true,
        }
    }

    fn load(&self) -> Option<DashboardSnapshot> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to read dashboard cache");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "ignoring corrupt dashboard cache");
                None
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
