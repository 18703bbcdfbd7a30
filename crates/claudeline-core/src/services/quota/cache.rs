//! Usage cache
//!
//! Single-entry, file-backed cache of the last fetch outcome for a profile.
//! Successful fetches are trusted for 60 seconds, failed ones for 15: usage
//! moves slowly compared to the render cadence, while a failure (rate limit,
//! network blip, revoked token) should be retried soon but never in a tight
//! loop across rapid re-invocations.
//!
//! The file holds one JSON object `{data, timestamp, ok}` and is replaced
//! whole on every write (serialize, write a sibling temp file, rename). There
//! is no locking; concurrent writers race and the last one wins.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::QuotaSnapshot;
use crate::profile::Profile;

// ============================================================================
// Constants
// ============================================================================

/// How long a successful fetch is served from cache
pub const SUCCESS_TTL: Duration = Duration::from_secs(60);

/// How long a failed fetch suppresses new attempts
pub const FAILURE_TTL: Duration = Duration::from_secs(15);

// ============================================================================
// Record
// ============================================================================

/// Persisted outcome of the last fetch attempt
///
/// `ok == true` always carries `data`; a failed record carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Snapshot from a successful fetch
    pub data: Option<QuotaSnapshot>,
    /// Capture time in unix seconds
    pub timestamp: i64,
    /// Whether the fetch succeeded
    pub ok: bool,
}

impl CacheRecord {
    /// Record a successful fetch
    pub fn success(snapshot: QuotaSnapshot, captured_at: DateTime<Utc>) -> Self {
        Self {
            data: Some(snapshot),
            timestamp: captured_at.timestamp(),
            ok: true,
        }
    }

    /// Record a failed fetch
    pub fn failure(captured_at: DateTime<Utc>) -> Self {
        Self {
            data: None,
            timestamp: captured_at.timestamp(),
            ok: false,
        }
    }

    /// Time-to-live for this outcome
    pub fn ttl(&self) -> Duration {
        if self.ok {
            SUCCESS_TTL
        } else {
            FAILURE_TTL
        }
    }

    /// Whether the record may still be served at `now`.
    ///
    /// A timestamp in the future (clock skew) is never fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.timestamp() - self.timestamp;
        age >= 0 && (age as u64) < self.ttl().as_secs()
    }

    /// The cached snapshot; `None` for a cached failure
    pub fn payload(&self) -> Option<&QuotaSnapshot> {
        self.data.as_ref()
    }

    pub fn into_payload(self) -> Option<QuotaSnapshot> {
        self.data
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a cache read did not produce a servable record
///
/// All variants mean the same thing to the caller: fetch again.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheMiss {
    #[error("no cached usage")]
    Missing,

    #[error("cached usage expired")]
    Expired,

    #[error("cached usage corrupt: {0}")]
    Corrupt(String),
}

// ============================================================================
// QuotaCache
// ============================================================================

/// File-backed cache for one profile
#[derive(Debug, Clone)]
pub struct QuotaCache {
    path: PathBuf,
}

impl QuotaCache {
    /// Cache stored at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache for a profile, in the system temp directory
    pub fn for_profile(profile: &Profile) -> Self {
        Self::new(profile.cache_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record if it is still fresh
    pub fn read(&self) -> Result<CacheRecord, CacheMiss> {
        self.read_at(Utc::now())
    }

    /// Read the record, judging freshness against `now`
    pub fn read_at(&self, now: DateTime<Utc>) -> Result<CacheRecord, CacheMiss> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CacheMiss::Missing),
            Err(e) => return Err(CacheMiss::Corrupt(e.to_string())),
        };

        let mut record: CacheRecord =
            serde_json::from_slice(&content).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;

        if record.ok && record.data.is_none() {
            return Err(CacheMiss::Corrupt("success record without data".to_string()));
        }
        if !record.ok {
            record.data = None;
        }

        if !record.is_fresh_at(now) {
            return Err(CacheMiss::Expired);
        }

        Ok(record)
    }

    /// Record a fetch outcome now. Best effort: errors are logged and dropped.
    pub fn write(&self, snapshot: Option<&QuotaSnapshot>, ok: bool) {
        self.write_at(Utc::now(), snapshot, ok)
    }

    /// Record a fetch outcome captured at `now`
    pub fn write_at(&self, now: DateTime<Utc>, snapshot: Option<&QuotaSnapshot>, ok: bool) {
        let record = match (ok, snapshot) {
            (true, Some(snapshot)) => CacheRecord::success(snapshot.clone(), now),
            (true, None) => {
                log::warn!("[quota:cache] Success without data, recording a failure");
                CacheRecord::failure(now)
            }
            (false, _) => CacheRecord::failure(now),
        };

        if let Err(e) = self.persist(&record) {
            log::warn!("[quota:cache] Failed to write {}: {}", self.path.display(), e);
        }
    }

    /// Replace the cache file with `record`
    fn persist(&self, record: &CacheRecord) -> std::io::Result<()> {
        let json = serde_json::to_vec(record)?;
        let tmp = self.temp_path();

        // Clear a leftover (or planted) entry; open_private refuses to reuse it
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e);
            }
        }

        let result = open_private(&tmp)
            .and_then(|mut file| file.write_all(&json))
            .and_then(|()| fs::rename(&tmp, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    /// Process-unique sibling of the cache file
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "claudeline-usage.json".to_string());
        self.path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }
}

/// Create a new file readable only by the owner; never follows an existing
/// entry at `path`
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quota::types::UsageWindow;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn snapshot() -> QuotaSnapshot {
        QuotaSnapshot::new(
            UsageWindow::new(42.5, Some(Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap())),
            UsageWindow::new(71.25, Some(Utc.with_ymd_and_hms(2025, 6, 5, 9, 30, 0).unwrap())),
        )
    }

    fn cache(dir: &TempDir) -> QuotaCache {
        QuotaCache::new(dir.path().join("claudeline-usage.json"))
    }

    #[test]
    fn test_round_trip_within_success_ttl() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), Some(&snapshot()), true);

        let record = cache.read_at(now() + secs(30)).unwrap();
        assert!(record.ok);
        assert_eq!(record.timestamp, now().timestamp());
        assert_eq!(record.payload(), Some(&snapshot()));
    }

    #[test]
    fn test_success_ttl_boundary() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), Some(&snapshot()), true);

        assert!(cache.read_at(now() + secs(59)).is_ok());
        assert_eq!(cache.read_at(now() + secs(60)), Err(CacheMiss::Expired));
    }

    #[test]
    fn test_failure_served_as_no_data() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), None, false);

        let record = cache.read_at(now() + secs(10)).unwrap();
        assert!(!record.ok);
        assert!(record.into_payload().is_none());
    }

    #[test]
    fn test_failure_ttl_boundary() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), None, false);

        assert!(cache.read_at(now() + secs(14)).is_ok());
        assert_eq!(cache.read_at(now() + secs(15)), Err(CacheMiss::Expired));
        assert_eq!(cache.read_at(now() + secs(20)), Err(CacheMiss::Expired));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(cache(&dir).read_at(now()), Err(CacheMiss::Missing));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        fs::write(cache.path(), "{\"data\": {\"five_hour\"").unwrap();

        assert!(matches!(cache.read_at(now()), Err(CacheMiss::Corrupt(_))));
    }

    #[test]
    fn test_success_without_data_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let json = format!(r#"{{"data": null, "timestamp": {}, "ok": true}}"#, now().timestamp());
        fs::write(cache.path(), json).unwrap();

        assert!(matches!(cache.read_at(now()), Err(CacheMiss::Corrupt(_))));
    }

    #[test]
    fn test_failure_record_drops_stray_data() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let record = CacheRecord {
            data: Some(snapshot()),
            timestamp: now().timestamp(),
            ok: false,
        };
        fs::write(cache.path(), serde_json::to_vec(&record).unwrap()).unwrap();

        assert_eq!(cache.read_at(now()).unwrap().payload(), None);
    }

    #[test]
    fn test_future_timestamp_is_expired() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now() + secs(3600), Some(&snapshot()), true);

        assert_eq!(cache.read_at(now()), Err(CacheMiss::Expired));
    }

    #[test]
    fn test_success_flag_without_snapshot_records_failure() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), None, true);

        let record = cache.read_at(now()).unwrap();
        assert!(!record.ok);
    }

    #[test]
    fn test_write_overwrites_previous_record() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), Some(&snapshot()), true);
        cache.write_at(now() + secs(5), None, false);

        let record = cache.read_at(now() + secs(6)).unwrap();
        assert!(!record.ok);
        assert_eq!(record.timestamp, (now() + secs(5)).timestamp());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_persisted_format() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), None, false);

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(cache.path()).unwrap()).unwrap();
        assert_eq!(value["ok"], serde_json::json!(false));
        assert_eq!(value["timestamp"], serde_json::json!(now().timestamp()));
        assert!(value["data"].is_null());
    }

    #[test]
    fn test_write_to_missing_dir_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let cache = QuotaCache::new(dir.path().join("no-such-dir").join("usage.json"));
        cache.write_at(now(), Some(&snapshot()), true);
        assert_eq!(cache.read_at(now()), Err(CacheMiss::Missing));
    }

    #[test]
    fn test_write_replaces_stale_temp_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        fs::write(cache.temp_path(), "leftover").unwrap();

        cache.write_at(now(), Some(&snapshot()), true);

        assert!(cache.read_at(now()).unwrap().ok);
        assert!(!cache.temp_path().exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_write_does_not_follow_planted_symlink() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        let target = dir.path().join("victim.txt");
        fs::write(&target, "untouched").unwrap();
        std::os::unix::fs::symlink(&target, cache.temp_path()).unwrap();

        cache.write_at(now(), Some(&snapshot()), true);

        assert_eq!(fs::read_to_string(&target).unwrap(), "untouched");
        assert!(cache.read_at(now()).unwrap().ok);
        assert!(!fs::symlink_metadata(cache.path()).unwrap().file_type().is_symlink());
    }

    #[test]
    #[cfg(unix)]
    fn test_cache_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);
        cache.write_at(now(), Some(&snapshot()), true);

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_for_profile_uses_fingerprinted_path() {
        let profile = Profile::new(Some("/Users/oa/.claude-work".to_string()));
        let cache = QuotaCache::for_profile(&profile);
        assert!(cache.path().ends_with("claudeline-usage-1ef5702c.json"));
    }
}
