//! In-memory response cache with a fixed time-to-live.
//!
//! Pure lookup/store: entries expire on read, nothing is evicted, and
//! expired entries stay addressable through [`ResponseCache::get_stale`]
//! for the emergency fallback path after total provider exhaustion.
//! Unbounded growth is accepted for the lifetime of one service instance.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::sync::RwLock;

struct CacheEntry {
    data: Value,
    stored_at: SystemTime,
}

impl CacheEntry {
    /// Age of the entry; a backwards clock jump reads as zero.
    fn age(&self) -> Duration {
        self.stored_at.elapsed().unwrap_or(Duration::ZERO)
    }
}

/// Shared response cache keyed by caller-constructed strings.
///
/// Keys follow `<provider-tag>_<symbol-or-join>[_<lookback-days>]` by
/// convention, but the cache itself has no knowledge of key structure.
/// Concurrent reads are safe; concurrent writes to the same key are
/// last-write-wins, which is acceptable because entries are idempotent
/// snapshots rather than accumulators.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the stored payload if present and younger than the TTL.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.age() <= self.ttl)
            .map(|entry| entry.data.clone())
    }

    /// Return the stored payload regardless of age.
    ///
    /// Used only as a last resort when every provider and relay has
    /// failed: stale data beats no data.
    pub async fn get_stale(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.data.clone())
    }

    /// Unconditionally overwrite the entry for a key.
    pub async fn set(&self, key: impl Into<String>, data: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                data,
                stored_at: SystemTime::now(),
            },
        );
    }

    /// Number of entries, fresh and stale alike.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Age an existing entry by the given amount, simulating clock
    /// advancement without sleeping.
    #[cfg(test)]
    pub(crate) async fn backdate(&self, key: &str, by: Duration) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.stored_at = entry
                .stored_at
                .checked_sub(by)
                .expect("backdated timestamp stays after the epoch");
        }
    }
}
