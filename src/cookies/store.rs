//! Cookie store infrastructure.
//!
//! A **cookie store** is the persistence layer behind a
//! [`PersistentCookieJar`](crate::cookies::PersistentCookieJar). The jar owns the
//! live cookies; the store only knows how to load a snapshot at construction time
//! and write a full snapshot back after each mutation.
//!
//! This module exports two implementations:
//! - [`JsonCookieStore`]: a single JSON file, rewritten on every persist.
//! - [`InMemoryCookieStore`]: keeps the last snapshot in memory (tests, private sessions).
mod in_memory;
mod json;

use crate::cookies::Cookie;
use crate::errors::CookieStoreError;
use std::sync::Arc;

pub use in_memory::InMemoryCookieStore;
pub use json::JsonCookieStore;

/// A handle to a type-erased cookie store.
pub type CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>;

/// Loads and persists full cookie snapshots.
///
/// Implementations must be internally synchronized since every method takes `&self`.
pub trait CookieStore: Send + Sync {
    /// Returns the persisted cookies.
    ///
    /// Missing or unreadable storage yields an empty list; malformed entries are
    /// skipped individually. This never fails.
    fn load(&self) -> Vec<Cookie>;

    /// Replaces the persisted state with `cookies`.
    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieStoreError>;
}
