mod common;

use std::{fs, time::Duration};

use chrono::{Duration as Days, TimeZone, Utc};
use insider_pulse::dashboard::cache::{CacheState, DashboardCache};
use tempfile::tempdir;

use common::{day, snapshot};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[test]
fn empty_slot_reads_nothing() {
    let dir = tempdir().unwrap();
    let cache = DashboardCache::new(dir.path().join("dashboard_cache.json"), DAY);
    assert!(cache.read(true).is_none());
    assert_eq!(cache.state(), CacheState::Empty);
    assert!(cache.cached_at().is_none());
}

#[test]
fn freshness_follows_max_age() {
    let dir = tempdir().unwrap();
    let cache = DashboardCache::new(dir.path().join("dashboard_cache.json"), DAY);
    let written = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    cache.write_at(&snapshot(day(2024, 6, 1)), written).unwrap();

    let within = written + Days::hours(23);
    assert_eq!(cache.state_at(within), CacheState::Fresh);
    let fresh = cache.read_at(false, within).unwrap();
    assert_eq!(fresh.cached_at, Some(written));

    let later = written + Days::hours(25);
    assert_eq!(cache.state_at(later), CacheState::Stale);
    assert!(cache.read_at(false, later).is_none());
    assert!(cache.read_at(true, later).is_some());
}

#[test]
fn age_equal_to_max_age_is_still_fresh() {
    let dir = tempdir().unwrap();
    let cache = DashboardCache::new(dir.path().join("dashboard_cache.json"), DAY);
    let written = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    cache.write_at(&snapshot(day(2024, 6, 1)), written).unwrap();

    let edge = written + Days::hours(24);
    assert_eq!(cache.state_at(edge), CacheState::Fresh);
    assert!(cache.read_at(false, edge).is_some());

    let past = edge + Days::seconds(1);
    assert_eq!(cache.state_at(past), CacheState::Stale);
    assert!(cache.read_at(false, past).is_none());
}

#[test]
fn cached_at_is_rfc3339_utc() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dashboard_cache.json");
    let cache = DashboardCache::new(&path, DAY);
    let written = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
    cache.write_at(&snapshot(day(2024, 6, 1)), written).unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["_cached_at"], "2024-06-01T08:30:00Z");
    assert_eq!(raw["as_of"], "2024-06-01");
}

#[test]
fn rewrite_replaces_previous_snapshot() {
    let dir = tempdir().unwrap();
    let cache = DashboardCache::new(dir.path().join("nested").join("dashboard_cache.json"), DAY);
    let first = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    cache.write_at(&snapshot(day(2024, 6, 1)), first).unwrap();
    cache
        .write_at(&snapshot(day(2024, 6, 2)), first + Days::hours(1))
        .unwrap();

    let current = cache.read_at(true, first + Days::hours(2)).unwrap();
    assert_eq!(current.as_of, day(2024, 6, 2));
    let leftovers = fs::read_dir(dir.path().join("nested")).unwrap().count();
    assert_eq!(leftovers, 1, "temp files must not linger");
}

#[test]
fn corrupt_or_unstamped_slot_reads_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dashboard_cache.json");
    let cache = DashboardCache::new(&path, DAY);

    fs::write(&path, "{ not json").unwrap();
    assert!(cache.read(true).is_none());
    assert_eq!(cache.state(), CacheState::Empty);

    let unstamped = serde_json::to_string(&snapshot(day(2024, 6, 1))).unwrap();
    fs::write(&path, unstamped).unwrap();
    assert!(cache.read(true).is_none());
}
