//! The composed HTTP client.
//!
//! [`HttpClient`] wires the policies around a [`Transport`]:
//!
//! 1. a fresh cache hit is returned without touching the network;
//! 2. a stale entry turns the request into a conditional one;
//! 3. the retry loop wraps every attempt, and each attempt attaches the
//!    `Cookie` header, issues the request and ingests `Set-Cookie`;
//! 4. a `304` for a stale entry returns the refreshed stored response;
//! 5. any other GET 2xx is stored.
//!
//! One client is meant to be shared by many concurrent requests: only the
//! cookie jar and the cache store are shared between them.

use std::sync::Arc;

use http::header::COOKIE;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cache::{CacheConfig, CacheLookup, CachePolicy, CacheStoreHandle};
use crate::config::ClientConfig;
use crate::cookies::{read_jar, write_jar, CookieJarHandle, DefaultCookieJar, PersistentCookieJar};
use crate::errors::{NetError, TransportError};
use crate::net::{insert_header, Request, ReqwestTransport, Response, Transport};
use crate::retry::RetryPolicy;
use crate::sse::{EventSource, SseConnectionState};

pub struct HttpClient<T: Transport + ?Sized> {
    transport: Arc<T>,
    config: ClientConfig,
    retry: RetryPolicy,
    cache: CachePolicy,
    cookies: CookieJarHandle,
}

impl HttpClient<ReqwestTransport> {
    /// Builds a client over `reqwest` from `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self, NetError> {
        let transport = ReqwestTransport::new(&config.user_agent, config.connect_timeout)?;
        Ok(Self::new(Arc::new(transport), config))
    }
}

impl<T: Transport + ?Sized + 'static> HttpClient<T> {
    /// Creates a client with an in-memory cache store. The cookie jar is
    /// file-backed when `config.cookie_file` is set.
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Self {
        let cookies: CookieJarHandle = match &config.cookie_file {
            Some(path) => PersistentCookieJar::open(path, config.persist_session_cookies).into(),
            None => DefaultCookieJar::new().into(),
        };

        Self {
            transport,
            retry: RetryPolicy::new(config.retry.clone()),
            cache: CachePolicy::default(),
            cookies,
            config,
        }
    }

    /// Replaces the cache backing store.
    pub fn with_cache_store(mut self, store: CacheStoreHandle) -> Self {
        self.cache = CachePolicy::new(store);
        self
    }

    /// Replaces the cookie jar, e.g. to share one jar between clients.
    pub fn with_cookie_jar(mut self, jar: CookieJarHandle) -> Self {
        self.cookies = jar;
        self
    }

    pub fn cookie_jar(&self) -> CookieJarHandle {
        self.cookies.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn cache_config(&self) -> Option<&CacheConfig> {
        self.config.cache.as_ref()
    }

    /// Sends `request` through cache, cookies and retry.
    pub async fn send(&self, request: Request) -> Result<Response, NetError> {
        self.send_with_cancel(request, &CancellationToken::new()).await
    }

    /// Like [`send`](Self::send); cancelling `cancel` aborts the in-flight
    /// attempt or pending retry with [`NetError::Cancelled`].
    pub async fn send_with_cancel(&self, mut request: Request, cancel: &CancellationToken) -> Result<Response, NetError> {
        if request.timeout.is_none() {
            request.timeout = Some(self.config.request_timeout);
        }

        let stale = match self.cache.lookup(&request.url, &request.method, self.cache_config()) {
            CacheLookup::Fresh(entry) => {
                log::debug!("cache hit for {}", request.url);
                return Ok(entry.to_response(request.url));
            }
            CacheLookup::Stale(entry) => {
                log::debug!("revalidating stale entry for {}", request.url);
                request.headers.extend(CachePolicy::conditional_headers(&entry));
                Some(entry)
            }
            CacheLookup::Miss => None,
        };

        let response = self
            .retry
            .execute_with_cancel(cancel, |_| self.attempt(request.clone()))
            .await?;

        if let (304, Some(entry), Some(config)) = (response.status, stale, self.cache_config()) {
            return Ok(self.cache.revalidated(&request.url, entry, &response, config));
        }

        self.cache
            .store(&request.url, &request.method, &response, self.cache_config());
        Ok(response)
    }

    /// Convenience GET for `url`.
    pub async fn get(&self, url: &str) -> Result<Response, NetError> {
        let url = Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{url}: {e}")))?;
        self.send(Request::get(url)).await
    }

    /// Opens a reconnecting SSE stream to `url`, sharing this client's cookie jar.
    pub fn event_source(&self, url: Url) -> EventSource {
        let state = SseConnectionState::new(url, Default::default(), self.config.reconnect.clone());
        EventSource::connect(self.transport.clone(), state, Some(self.cookies.clone()))
    }

    async fn attempt(&self, mut request: Request) -> Result<Response, TransportError> {
        let cookie_header = read_jar(&self.cookies).get_request_cookies(&request.url);
        if let Some(header) = cookie_header {
            insert_header(&mut request.headers, COOKIE, &header);
        }

        let response = self.transport.issue(request).await?;

        let stored = write_jar(&self.cookies).store_response_cookies(&response.url, &response.headers);
        if stored > 0 {
            log::trace!("stored {stored} cookies from {}", response.url);
        }
        Ok(response)
    }
}
