//! Client configuration.
//!
//! `ClientConfig` collects every policy knob of an
//! [`HttpClient`](crate::client::HttpClient): retry, caching, SSE
//! reconnection, identity and cookie persistence. It has sensible defaults
//! via [`Default`] and a fluent [`ClientConfig::builder()`] that validates.
//!
//! # Examples
//!
//! ```rust
//! use gosub_net::config::ClientConfig;
//! use gosub_net::cache::CacheConfig;
//! use std::time::Duration;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::builder()
//!     .user_agent("Gosub/0.1")
//!     .request_timeout(Duration::from_secs(10))
//!     .cache(CacheConfig::default().with_ttl_seconds(60))
//!     .cookie_file("cookies.json")
//!     .build()?; // returns Result<ClientConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns [`ConfigError`] when a base delay exceeds its
//! maximum, a backoff multiplier is below 1 or not finite, reconnection is
//! enabled with zero attempts, or the request timeout is zero.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::retry::RetryConfig;
use crate::sse::ReconnectConfig;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub retry: RetryConfig,
    /// `None` disables the response cache.
    pub cache: Option<CacheConfig>,
    pub reconnect: ReconnectConfig,
    pub user_agent: String,
    /// Applied to buffered requests that carry no timeout of their own.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// JSON cookie file; the jar stays in memory when unset.
    pub cookie_file: Option<PathBuf>,
    /// Write cookies without an expiry to the cookie file too.
    pub persist_session_cookies: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            cache: None,
            reconnect: ReconnectConfig::default(),
            user_agent: "GosubNet/1.0".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            cookie_file: None,
            persist_session_cookies: false,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
}

impl ClientConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn retry(self, retry: RetryConfig) -> Self { self.map(|c| c.retry = retry) }
    pub fn cache(self, cache: CacheConfig) -> Self { self.map(|c| c.cache = Some(cache)) }
    pub fn no_cache(self) -> Self { self.map(|c| c.cache = None) }
    pub fn reconnect(self, reconnect: ReconnectConfig) -> Self { self.map(|c| c.reconnect = reconnect) }
    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn request_timeout(self, timeout: Duration) -> Self { self.map(|c| c.request_timeout = timeout) }
    pub fn connect_timeout(self, timeout: Duration) -> Self { self.map(|c| c.connect_timeout = timeout) }
    pub fn cookie_file<P: Into<PathBuf>>(self, path: P) -> Self { self.map(|c| c.cookie_file = Some(path.into())) }
    pub fn persist_session_cookies(self, on: bool) -> Self { self.map(|c| c.persist_session_cookies = on) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ClientConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{which} base delay {base:?} exceeds max delay {max:?}")]
    BaseDelayAboveMax {
        which: &'static str,
        base: Duration,
        max: Duration,
    },
    #[error("{which} backoff multiplier {value} must be finite and at least 1.0")]
    InvalidMultiplier { which: &'static str, value: f64 },
    #[error("reconnect max_attempts must be at least 1 when reconnection is enabled")]
    ZeroReconnectAttempts,
    #[error("request timeout must be non-zero")]
    ZeroTimeout,
}

fn validate_backoff(which: &'static str, base: Duration, max: Duration, multiplier: f64) -> Result<(), ConfigError> {
    if base > max {
        return Err(ConfigError::BaseDelayAboveMax { which, base, max });
    }
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(ConfigError::InvalidMultiplier { which, value: multiplier });
    }
    Ok(())
}

fn validate(c: &ClientConfig) -> Result<(), ConfigError> {
    validate_backoff("retry", c.retry.base_delay, c.retry.max_delay, c.retry.backoff_multiplier)?;
    validate_backoff(
        "reconnect",
        c.reconnect.base_delay,
        c.reconnect.max_delay,
        c.reconnect.backoff_multiplier,
    )?;
    if c.reconnect.enabled && c.reconnect.max_attempts == 0 {
        return Err(ConfigError::ZeroReconnectAttempts);
    }
    if c.request_timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout);
    }
    Ok(())
}
