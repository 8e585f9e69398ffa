use std::sync::{Mutex, PoisonError};

use crate::cookies::store::CookieStore;
use crate::cookies::Cookie;
use crate::errors::CookieStoreError;

/// Cookie store that keeps the last persisted snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    snapshot: Mutex<Vec<Cookie>>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, as if `cookies` had been persisted earlier.
    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        Self {
            snapshot: Mutex::new(cookies),
        }
    }
}

impl CookieStore for InMemoryCookieStore {
    fn load(&self) -> Vec<Cookie> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieStoreError> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = cookies.to_vec();
        Ok(())
    }
}
