//! Cookies: [`CookieJar`], [`CookieStore`] and backends.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`. Take a
//!   read lock for lookups and a write lock for mutations.
//! - [`CookieStoreHandle`] is `Arc<dyn CookieStore + Send + Sync>`. Stores
//!   synchronize internally; their methods take `&self`.
//!
//! # Typical usage
//! ```ignore
//! let jar: CookieJarHandle = DefaultCookieJar::new().into();
//! let header = cookies::read_jar(&jar).get_request_cookies(&url);
//! cookies::write_jar(&jar).store_response_cookies(&url, &headers);
//! ```

mod cookie;
mod cookie_jar;
mod persistent_cookie_jar;
mod store;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use cookie::{domain_matches, parse_response_cookies, path_matches, Cookie, SameSite};
pub use cookie_jar::{CookieJar, DefaultCookieJar};
pub use persistent_cookie_jar::PersistentCookieJar;
pub use store::{CookieStore, CookieStoreHandle, InMemoryCookieStore, JsonCookieStore};

/// A shared, read/write-locked handle to a type-erased [`CookieJar`].
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

impl From<DefaultCookieJar> for CookieJarHandle {
    fn from(jar: DefaultCookieJar) -> Self {
        Arc::new(RwLock::new(jar))
    }
}

impl From<PersistentCookieJar> for CookieJarHandle {
    fn from(jar: PersistentCookieJar) -> Self {
        Arc::new(RwLock::new(jar))
    }
}

/// Read-locks a jar. A poisoned lock is recovered: jar state is replaced
/// whole per operation, so it is never left half-written.
pub fn read_jar(jar: &CookieJarHandle) -> RwLockReadGuard<'_, dyn CookieJar + Send + Sync + 'static> {
    jar.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-locks a jar, recovering from poisoning like [`read_jar`].
pub fn write_jar(jar: &CookieJarHandle) -> RwLockWriteGuard<'_, dyn CookieJar + Send + Sync + 'static> {
    jar.write().unwrap_or_else(PoisonError::into_inner)
}
