//! In-memory TTL cache for computed pricing results

use crate::types::PricingResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A cached pricing result and the instant it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: PricingResult,
    pub timestamp: Instant,
}

impl CacheEntry {
    /// True while the entry is younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.timestamp.elapsed() < ttl
    }

    /// Age of the entry
    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Cache of pricing results keyed by `PriceQuery::cache_key`
///
/// Staleness is checked on read. Stale entries stay in the map until they
/// are overwritten or the cache is cleared.
pub struct PriceCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl PriceCache {
    /// Creates an empty cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the entry for `key` if present and fresh
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if !entry.is_fresh(self.ttl) {
            tracing::debug!(key, age_secs = entry.age().as_secs(), "Cached price is stale");
            return None;
        }
        Some(entry.clone())
    }

    /// Stores `data` under `key`, replacing any previous entry
    pub async fn set(&self, key: &str, data: PricingResult) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp: Instant::now(),
            },
        );
        tracing::debug!(key, "Cached pricing result");
    }

    /// Removes every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of entries that are still fresh
    pub async fn fresh_len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.is_fresh(self.ttl)).count()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
