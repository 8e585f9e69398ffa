//! Backing storage for cached responses.
mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

pub use in_memory::InMemoryCacheStore;

/// A handle to a type-erased cache store, shared by every request of a client.
pub type CacheStoreHandle = Arc<dyn CacheStore>;

/// Object-safe key/value store for cache entries.
///
/// Values are opaque to the store; [`CachePolicy`](crate::cache::CachePolicy)
/// validates their shape on the way out.
pub trait CacheStore: Send + Sync {
    /// Retrieves the value stored under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key` for at most `ttl`.
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Removes the value under `key`, if any.
    fn remove(&self, key: &str) -> Result<()>;
}
