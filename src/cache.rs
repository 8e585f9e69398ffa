//! HTTP response cache: keys, freshness, revalidation.
//!
//! [`CachePolicy`] decides what may be served from or written to a pluggable
//! [`CacheStore`]. Entries are plain JSON values in the store; anything that
//! does not have the [`CacheEntry`] shape reads as a miss.

mod entry;
mod policy;
mod store;

pub use entry::CacheEntry;
pub use policy::{cache_key, CacheConfig, CacheLookup, CachePolicy};
pub use store::{CacheStore, CacheStoreHandle, InMemoryCacheStore};
