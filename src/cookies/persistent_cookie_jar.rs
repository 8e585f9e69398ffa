use std::path::PathBuf;
use std::sync::Arc;

use crate::cookies::cookie_jar::DefaultCookieJar;
use crate::cookies::store::{CookieStoreHandle, JsonCookieStore};
use crate::cookies::{Cookie, CookieJar};
use crate::errors::CookieStoreError;
use http::HeaderMap;
use url::Url;

/// A `CookieJar` decorator that persists changes after each mutation.
///
/// Reads go straight to the in-memory jar. Every write is followed by a full
/// snapshot written to the backing store. Session cookies stay in memory but
/// are left out of the snapshot unless `persist_session_cookies` is set.
pub struct PersistentCookieJar {
    /// In-memory jar that holds the live cookie state.
    inner: DefaultCookieJar,
    /// Store responsible for persistence.
    store: CookieStoreHandle,
    /// Whether cookies without an expiry are written to the store.
    persist_session_cookies: bool,
}

impl PersistentCookieJar {
    /// Creates a jar seeded from `store`.
    pub fn new(store: CookieStoreHandle, persist_session_cookies: bool) -> Self {
        let mut inner = DefaultCookieJar::new();
        for cookie in store.load() {
            inner.set_cookie(cookie);
        }
        log::debug!("loaded {} persisted cookies", inner.len());

        Self {
            inner,
            store,
            persist_session_cookies,
        }
    }

    /// Opens a jar backed by a JSON file at `path`. A missing file starts an empty jar.
    pub fn open(path: impl Into<PathBuf>, persist_session_cookies: bool) -> Self {
        Self::new(Arc::new(JsonCookieStore::new(path)), persist_session_cookies)
    }

    /// Writes the current snapshot to the store, reporting failures.
    pub fn save(&self) -> Result<(), CookieStoreError> {
        let snapshot: Vec<Cookie> = self
            .inner
            .all_cookies()
            .into_iter()
            .filter(|c| self.persist_session_cookies || !c.is_session())
            .filter(|c| !c.is_expired())
            .collect();

        self.store.persist(&snapshot)
    }

    /// Best-effort persist used after mutations; a failure is logged, never raised.
    fn persist(&self) {
        if let Err(e) = self.save() {
            log::error!("failed to persist cookies: {e}");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CookieJar for PersistentCookieJar {
    fn set_cookie(&mut self, cookie: Cookie) {
        self.inner.set_cookie(cookie);
        self.persist();
    }

    fn get_cookies(&self, domain: &str, path: &str) -> Vec<Cookie> {
        self.inner.get_cookies(domain, path)
    }

    fn clear_expired(&mut self) {
        self.inner.clear_expired();
        self.persist();
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.persist();
    }

    fn remove_cookie(&mut self, name: &str, domain: &str, path: &str) -> bool {
        let removed = self.inner.remove_cookie(name, domain, path);
        if removed {
            self.persist();
        }
        removed
    }

    fn all_cookies(&self) -> Vec<Cookie> {
        self.inner.all_cookies()
    }

    /// Stores cookies from a response, then persists once for the whole batch.
    fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) -> usize {
        let stored = self.inner.store_response_cookies(url, headers);
        if stored > 0 {
            self.persist();
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::unix_now;
    use crate::cookies::store::{CookieStore, InMemoryCookieStore};

    fn lasting(name: &str) -> Cookie {
        Cookie::new(name, "v", "example.com").with_expires(unix_now() + 3600)
    }

    #[test]
    fn every_mutation_is_persisted() {
        let store = Arc::new(InMemoryCookieStore::new());
        let mut jar = PersistentCookieJar::new(store.clone(), true);

        jar.set_cookie(lasting("a"));
        assert_eq!(store.load().len(), 1);

        jar.set_cookie(lasting("b"));
        assert_eq!(store.load().len(), 2);

        assert!(jar.remove_cookie("a", "example.com", "/"));
        assert_eq!(store.load().len(), 1);

        jar.clear();
        assert!(store.load().is_empty());
    }

    #[test]
    fn session_cookies_stay_in_memory_only() {
        let store = Arc::new(InMemoryCookieStore::new());
        let mut jar = PersistentCookieJar::new(store.clone(), false);

        jar.set_cookie(Cookie::new("session", "1", "example.com"));
        jar.set_cookie(lasting("durable"));

        assert_eq!(jar.len(), 2);
        let persisted: Vec<_> = store.load().into_iter().map(|c| c.name).collect();
        assert_eq!(persisted, vec!["durable"]);
    }

    #[test]
    fn session_cookies_persisted_when_enabled() {
        let store = Arc::new(InMemoryCookieStore::new());
        let mut jar = PersistentCookieJar::new(store.clone(), true);

        jar.set_cookie(Cookie::new("session", "1", "example.com"));
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn reloads_from_file_on_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        {
            let mut jar = PersistentCookieJar::open(&path, false);
            jar.set_cookie(lasting("kept"));
            jar.set_cookie(Cookie::new("session", "1", "example.com"));
        }

        let jar = PersistentCookieJar::open(&path, false);
        let names: Vec<_> = jar.all_cookies().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["kept"]);
        assert_eq!(jar.get_cookie_header("example.com", "/", false), "kept=v");
    }

    #[test]
    fn response_cookies_persist_once_per_batch() {
        let store = Arc::new(InMemoryCookieStore::new());
        let mut jar = PersistentCookieJar::new(store.clone(), true);
        let url = Url::parse("https://example.com/").unwrap();

        let mut headers = HeaderMap::new();
        headers.append(http::header::SET_COOKIE, "a=1".parse().unwrap());
        headers.append(http::header::SET_COOKIE, "b=2".parse().unwrap());

        assert_eq!(jar.store_response_cookies(&url, &headers), 2);
        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn failed_persist_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be written as a file.
        let mut jar = PersistentCookieJar::open(dir.path(), true);

        jar.set_cookie(lasting("a"));
        assert_eq!(jar.len(), 1);
        assert!(jar.save().is_err());
    }
}
