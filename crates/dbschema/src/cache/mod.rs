//! Second-level metadata cache.
//!
//! The [`Cache`] trait is the external key-value store consulted beneath the
//! `Schema` in-process maps. Implementations:
//!
//! - [`MemoryCache`]: process-local map with optional expiry
//! - [`NullCache`]: never stores anything
//!
//! # Design Pattern
//!
//! Strategy: `Schema` holds an `Arc<dyn Cache>` and never knows the concrete
//! store. Values are `serde_json::Value` so any serialisable metadata can be
//! stored without the cache knowing its type.

mod memory;
mod null;

pub use memory::MemoryCache;
pub use null::NullCache;

use crate::error::Result;

/// Opaque get/put/flush store.
///
/// The store provides its own consistency guarantees; writes are full
/// replacements, so concurrent populators at worst repeat work.
pub trait Cache: Send + Sync {
    /// Value stored under `key`, if present and not expired.
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store `value` under `key`. `forever` entries never expire.
    fn put(&self, key: &str, value: serde_json::Value, forever: bool) -> Result<()>;

    /// Remove one key.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key.
    fn flush(&self) -> Result<()>;

    /// Store identifier for logging (e.g., "memory", "null").
    fn cache_type(&self) -> &'static str;
}
