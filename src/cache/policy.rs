use std::sync::Arc;
use std::time::Duration;

use http::header::{CACHE_CONTROL, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::{HeaderMap, Method};
use sha2::{Digest, Sha256};
use url::Url;

use crate::cache::{CacheEntry, CacheStoreHandle, InMemoryCacheStore};
use crate::clock::unix_now;
use crate::net::{insert_header, Response};

const KEY_PREFIX: &str = "gosub-cache:";

/// Per-client cache settings. Caching is off when no config is supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Freshness lifetime used when the server gives none (or is ignored).
    pub ttl_seconds: u64,
    /// Honour `Cache-Control: max-age` / `no-store` from the origin.
    pub respect_server_headers: bool,
    /// How long an entry stays in the store after going stale, available for
    /// conditional revalidation.
    pub stale_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            respect_server_headers: true,
            stale_ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn with_ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = ttl;
        self
    }

    #[must_use]
    pub fn with_respect_server_headers(mut self, respect: bool) -> Self {
        self.respect_server_headers = respect;
        self
    }

    #[must_use]
    pub fn with_stale_ttl_seconds(mut self, ttl: u64) -> Self {
        self.stale_ttl_seconds = ttl;
        self
    }
}

/// Result of looking a request up in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Unexpired entry; serve without contacting the origin.
    Fresh(CacheEntry),
    /// Expired entry still held for revalidation.
    Stale(CacheEntry),
    Miss,
}

/// Cache key for `url`: a hash of the URL with its fragment removed.
pub fn cache_key(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let digest = Sha256::digest(normalized.as_str().as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(digest))
}

/// Cache decisions for GET requests over a shared [`CacheStore`](crate::cache::CacheStore).
#[derive(Clone)]
pub struct CachePolicy {
    store: CacheStoreHandle,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()))
    }
}

impl CachePolicy {
    pub fn new(store: CacheStoreHandle) -> Self {
        Self { store }
    }

    pub fn store_handle(&self) -> CacheStoreHandle {
        self.store.clone()
    }

    /// Looks `url` up. Non-GET requests, a missing config, store failures and
    /// malformed entries are all misses.
    pub fn lookup(&self, url: &Url, method: &Method, config: Option<&CacheConfig>) -> CacheLookup {
        if *method != Method::GET || config.is_none() {
            return CacheLookup::Miss;
        }

        let key = cache_key(url);
        let value = match self.store.get(&key) {
            Ok(Some(value)) => value,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => {
                log::warn!("cache lookup for {url} failed: {e}");
                return CacheLookup::Miss;
            }
        };

        match CacheEntry::from_value(value) {
            Some(entry) if entry.is_fresh_at(unix_now()) => CacheLookup::Fresh(entry),
            Some(entry) => CacheLookup::Stale(entry),
            None => CacheLookup::Miss,
        }
    }

    /// Returns the cached response only if it is still fresh.
    pub fn try_serve(&self, url: &Url, method: &Method, config: Option<&CacheConfig>) -> Option<Response> {
        match self.lookup(url, method, config) {
            CacheLookup::Fresh(entry) => Some(entry.to_response(url.clone())),
            _ => None,
        }
    }

    /// Stores a GET 2xx response. Returns whether an entry was written.
    pub fn store(&self, url: &Url, method: &Method, response: &Response, config: Option<&CacheConfig>) -> bool {
        let Some(config) = config else {
            return false;
        };
        if *method != Method::GET || !response.is_success() {
            return false;
        }
        if config.respect_server_headers && has_no_store(&response.headers) {
            log::debug!("not caching {url}: no-store");
            return false;
        }

        let now = unix_now();
        let expires_at = compute_expiry(&response.headers, config, now);
        self.write(url, &CacheEntry::from_response(response, expires_at), config, now)
    }

    /// Request headers that make a revalidation of `entry` conditional.
    pub fn conditional_headers(entry: &CacheEntry) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(etag) = entry.etag() {
            insert_header(&mut headers, IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified() {
            insert_header(&mut headers, IF_MODIFIED_SINCE, last_modified);
        }
        headers
    }

    /// Handles a `304 Not Modified` for a stale `entry`: refreshes its expiry
    /// from the 304's headers and returns the stored response.
    pub fn revalidated(&self, url: &Url, mut entry: CacheEntry, not_modified: &Response, config: &CacheConfig) -> Response {
        let now = unix_now();
        entry.expires_at = compute_expiry(&not_modified.headers, config, now);
        self.write(url, &entry, config, now);
        log::debug!("revalidated {url}, fresh until {}", entry.expires_at);
        entry.to_response(url.clone())
    }

    fn write(&self, url: &Url, entry: &CacheEntry, config: &CacheConfig, now: i64) -> bool {
        let freshness = entry.expires_at - now;
        if freshness <= 0 {
            return false;
        }
        let Some(value) = entry.to_value() else {
            return false;
        };

        let ttl = Duration::from_secs((freshness as u64).saturating_add(config.stale_ttl_seconds));
        match self.store.set(&cache_key(url), value, ttl) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("cache store for {url} failed: {e}");
                false
            }
        }
    }
}

/// Expiry for a response received at `now`: server `max-age` when allowed
/// and present, the configured ttl otherwise.
fn compute_expiry(headers: &HeaderMap, config: &CacheConfig, now: i64) -> i64 {
    let lifetime = config
        .respect_server_headers
        .then(|| max_age(headers))
        .flatten()
        .unwrap_or(config.ttl_seconds);
    now.saturating_add(i64::try_from(lifetime).unwrap_or(i64::MAX))
}

fn cache_directives(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|d| d.trim().to_ascii_lowercase())
}

fn max_age(headers: &HeaderMap) -> Option<u64> {
    cache_directives(headers).find_map(|d| {
        let (name, value) = d.split_once('=')?;
        if name.trim() != "max-age" {
            return None;
        }
        value.trim().trim_matches('"').parse().ok()
    })
}

fn has_no_store(headers: &HeaderMap) -> bool {
    cache_directives(headers).any(|d| d == "no-store")
}
