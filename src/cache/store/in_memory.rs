use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::cache::CacheStore;

/// In-memory cache store (no persistence). Used when the embedder supplies none.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values. Expired ones count until the next `get` of
    /// their key or the next `set`.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, (Value, Instant)>>> {
        self.entries.lock().map_err(|_| anyhow!("cache store lock poisoned"))
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let deadline = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow!("cache ttl {ttl:?} out of range"))?;

        let mut entries = self.lock()?;
        entries.retain(|_, (_, expires)| *expires > now);
        entries.insert(key.to_string(), (value, deadline));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_get_remove() {
        let store = InMemoryCacheStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", json!({"a": 1}), Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!({"a": 1})));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let store = InMemoryCacheStore::new();
        store.set("k", json!(1), Duration::ZERO).unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn absurd_ttl_is_an_error() {
        let store = InMemoryCacheStore::new();
        assert!(store.set("k", json!(1), Duration::MAX).is_err());
    }

    #[test]
    fn set_sweeps_expired_entries() {
        let store = InMemoryCacheStore::new();
        store.set("old-a", json!(1), Duration::ZERO).unwrap();
        store.set("old-b", json!(2), Duration::ZERO).unwrap();
        store.set("live", json!(3), Duration::from_secs(60)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("live").unwrap(), Some(json!(3)));
    }
}
