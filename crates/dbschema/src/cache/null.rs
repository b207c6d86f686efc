//! Cache that stores nothing.
//!
//! Used when `cache_enabled` is false: every lookup misses and discovery
//! always goes to the catalog (the in-process maps still apply).

use tracing::debug;

use super::Cache;
use crate::error::Result;

/// No-op cache.
pub struct NullCache {
    logged: std::sync::atomic::AtomicBool,
}

impl NullCache {
    /// Create a new no-op cache.
    pub fn new() -> Self {
        Self {
            logged: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for NullCache {
    fn get(&self, _key: &str) -> Option<serde_json::Value> {
        None
    }

    fn put(&self, _key: &str, _value: serde_json::Value, _forever: bool) -> Result<()> {
        if !self
            .logged
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            debug!("External schema cache disabled; metadata is kept in-process only");
        }
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn cache_type(&self) -> &'static str {
        "null"
    }
}
