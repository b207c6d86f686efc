//! In-process cache backed by a `parking_lot` RwLock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::Cache;
use crate::error::Result;

struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

/// Process-local cache.
///
/// Entries stored without `forever` expire after the configured TTL; with no
/// TTL every entry lives until removed or flushed. Hit and miss counters are
/// kept for diagnostics.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    /// Cache whose entries never expire.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache whose non-`forever` entries expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new()
        }
    }

    /// Number of live and expired entries held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let found = {
            let entries = self.entries.read();
            entries.get(key).and_then(|e| match e.expires_at {
                Some(at) if at <= Instant::now() => None,
                _ => Some(e.value.clone()),
            })
        };
        match found {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn put(&self, key: &str, value: serde_json::Value, forever: bool) -> Result<()> {
        let expires_at = match (forever, self.ttl) {
            (false, Some(ttl)) => Some(Instant::now() + ttl),
            _ => None,
        };
        self.entries
            .write()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn cache_type(&self) -> &'static str {
        "memory"
    }
}
