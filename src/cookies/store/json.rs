//! JSON-backed cookie store.
//!
//! `JsonCookieStore` keeps the whole jar in a single JSON file: an array of
//! cookie objects (`name`, `value`, `expires`, `domain`, `path`, `secure`,
//! `httpOnly`, `maxAge`, `sameSite`), optional keys omitted when absent.
//!
//! ### I/O characteristics
//! - `persist` rewrites the entire file; nothing is appended.
//! - A missing file is an empty jar. An unreadable or malformed file is logged
//!   and also treated as empty, so a corrupt file never prevents start-up.
//! - Entries that fail to deserialize, or have already expired, are skipped
//!   one by one on load.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::clock::unix_now;
use crate::cookies::store::CookieStore;
use crate::cookies::Cookie;
use crate::errors::CookieStoreError;

/// A JSON file that holds every persisted cookie.
#[derive(Debug, Clone)]
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
}

impl JsonCookieStore {
    /// Creates a store for `path`. The file is created on the first persist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("cannot read cookie file {}: {e}", self.path.display());
                None
            }
        }
    }
}

impl CookieStore for JsonCookieStore {
    fn load(&self) -> Vec<Cookie> {
        let Some(contents) = self.read_file() else {
            return Vec::new();
        };

        let entries: Vec<Value> = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cookie file {} is not a JSON array, starting empty: {e}", self.path.display());
                return Vec::new();
            }
        };

        let now = unix_now();
        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Cookie>(entry) {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    log::warn!("skipping malformed cookie in {}: {e}", self.path.display());
                    None
                }
            })
            .filter(|cookie| !cookie.is_expired_at(now))
            .collect()
    }

    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieStoreError> {
        let contents = serde_json::to_string_pretty(cookies)?;
        fs::write(&self.path, contents)?;
        log::debug!("persisted {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}
