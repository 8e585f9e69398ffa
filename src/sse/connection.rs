use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderName, ACCEPT, CACHE_CONTROL};
use http::{HeaderMap, HeaderValue};
use url::Url;

use crate::backoff;
use crate::errors::TransportError;
use crate::net::{insert_header, Request};
use crate::retry::{matches_retryable, ErrorPredicate, DEFAULT_RETRYABLE_ERRORS};
use crate::sse::SseEvent;

/// Reconnection policy for an SSE stream.
#[derive(Clone)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Failed connections tolerated in a row before giving up.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub retryable_errors: Vec<String>,
    pub retryable_predicate: Option<ErrorPredicate>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable_errors: DEFAULT_RETRYABLE_ERRORS.iter().map(|s| s.to_string()).collect(),
            retryable_predicate: None,
        }
    }
}

impl fmt::Debug for ReconnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectConfig")
            .field("enabled", &self.enabled)
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_errors", &self.retryable_errors)
            .field("retryable_predicate", &self.retryable_predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ReconnectConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn with_retryable_errors<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_errors = fragments.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_retryable_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TransportError) -> bool + Send + Sync + 'static,
    {
        self.retryable_predicate = Some(Arc::new(predicate));
        self
    }
}

/// Sticky state of one logical SSE stream across reconnects.
#[derive(Debug, Clone)]
pub struct SseConnectionState {
    url: Url,
    headers: HeaderMap,
    config: ReconnectConfig,
    attempt_count: u32,
    last_event_id: Option<String>,
    /// Server-requested reconnection time in milliseconds.
    retry_override: Option<u64>,
}

impl SseConnectionState {
    pub fn new(url: Url, headers: HeaderMap, config: ReconnectConfig) -> Self {
        Self {
            url,
            headers,
            config,
            attempt_count: 0,
            last_event_id: None,
            retry_override: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    pub fn retry_override(&self) -> Option<u64> {
        self.retry_override
    }

    /// True once `max_attempts` failed connections have been counted.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempt_count >= self.config.max_attempts
    }

    /// Whether `error` is transient under the configured patterns or
    /// predicate, regardless of the attempt budget.
    pub fn is_retryable_error(&self, error: &TransportError) -> bool {
        matches_retryable(error, &self.config.retryable_errors, self.config.retryable_predicate.as_ref())
    }

    /// Whether a connection that failed with `error` should be retried.
    pub fn should_reconnect(&self, error: &TransportError) -> bool {
        self.config.enabled && !self.attempts_exhausted() && self.is_retryable_error(error)
    }

    /// Delay before the next connection attempt. A server `retry` value is
    /// used as-is; otherwise backoff is computed from the attempt count.
    pub fn get_reconnect_delay(&self) -> Duration {
        if let Some(ms) = self.retry_override {
            return Duration::from_millis(ms);
        }
        backoff::delay(
            self.attempt_count,
            self.config.base_delay,
            self.config.max_delay,
            self.config.backoff_multiplier,
            self.config.jitter,
        )
    }

    pub fn increment_attempt(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
    }

    /// Called after a successful (re)connect. The last event id survives.
    pub fn reset_attempts(&mut self) {
        self.attempt_count = 0;
    }

    /// Records the sticky parts of a dispatched event.
    pub fn observe(&mut self, event: &SseEvent) {
        if let Some(id) = &event.id {
            self.last_event_id = if id.is_empty() { None } else { Some(id.clone()) };
        }
        if let Some(retry) = event.retry {
            self.retry_override = Some(retry);
        }
    }

    /// Headers for the next connection attempt, including `Last-Event-ID`
    /// once an id has been seen.
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Some(id) = &self.last_event_id {
            insert_header(&mut headers, HeaderName::from_static("last-event-id"), id);
        }
        headers
    }

    pub fn request(&self) -> Request {
        let mut request = Request::get(self.url.clone());
        request.headers = self.request_headers();
        request
    }
}
