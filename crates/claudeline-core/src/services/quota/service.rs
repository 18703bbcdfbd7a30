//! Quota service
//!
//! Combines the cache and a fetcher into the single "current usage" call the
//! status line makes once per run:
//!
//! ```text
//! CACHE_LOOKUP ─┬─ hit ──────────────────────────────► return cached payload
//!               └─ missing / expired / corrupt ─► FETCH
//!                                                  ├─ ok   ─► write success ─► Some
//!                                                  └─ fail ─► write failure ─► None
//! ```
//!
//! Errors never escape: `None` is the failure signal, and the formatting layer
//! just leaves the usage segments out.

use chrono::{DateTime, Utc};

use super::cache::QuotaCache;
use super::provider::QuotaFetcher;
use super::types::QuotaSnapshot;

/// Cached access to the usage windows for one profile
pub struct QuotaService<F> {
    cache: QuotaCache,
    fetcher: F,
}

impl<F: QuotaFetcher> QuotaService<F> {
    pub fn new(cache: QuotaCache, fetcher: F) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &QuotaCache {
        &self.cache
    }

    /// Current usage, served from cache when fresh
    pub async fn get_quota(&self, token: &str) -> Option<QuotaSnapshot> {
        self.get_quota_with_clock(token, Utc::now).await
    }

    /// Current usage with the clock frozen at `now`
    pub async fn get_quota_at(&self, token: &str, now: DateTime<Utc>) -> Option<QuotaSnapshot> {
        self.get_quota_with_clock(token, || now).await
    }

    /// Current usage, reading time from `clock`
    ///
    /// At most one fetch is attempted per call, and none while a fresh record
    /// (success or failure) is cached. An empty token never touches the cache
    /// or the network. The written record is stamped after the fetch returns.
    pub async fn get_quota_with_clock<C>(&self, token: &str, clock: C) -> Option<QuotaSnapshot>
    where
        C: Fn() -> DateTime<Utc>,
    {
        if token.is_empty() {
            log::debug!("[quota:service] No access token, skipping usage");
            return None;
        }

        match self.cache.read_at(clock()) {
            Ok(record) => {
                log::debug!(
                    "[quota:service] Serving cached {} from {}",
                    if record.ok { "usage" } else { "failure" },
                    record.timestamp
                );
                return record.into_payload();
            }
            Err(miss) => log::debug!("[quota:service] {}, fetching", miss),
        }

        match self.fetcher.fetch(token).await {
            Ok(snapshot) => {
                self.cache.write_at(clock(), Some(&snapshot), true);
                Some(snapshot)
            }
            Err(e) => {
                log::warn!("[quota:service] Usage fetch failed: {}", e);
                self.cache.write_at(clock(), None, false);
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
