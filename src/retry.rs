//! Retry policy for transport calls.
//!
//! A [`RetryPolicy`] wraps each attempt of a single logical request. It owns
//! no per-request state: the attempt counter lives in the loop of
//! [`RetryPolicy::execute_with_cancel`], so one policy can drive any number of
//! concurrent requests.
//!
//! ```ignore
//! let policy = RetryPolicy::new(RetryConfig::default().with_max_retries(5));
//! let response = policy.execute(|attempt| transport.issue(request.clone())).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backoff;
use crate::errors::{NetError, TransportError};

/// Custom classifier for transport failures. When set it replaces the
/// substring match entirely.
pub type ErrorPredicate = Arc<dyn Fn(&TransportError) -> bool + Send + Sync>;

/// Error message fragments treated as transient by default.
pub const DEFAULT_RETRYABLE_ERRORS: &[&str] = &[
    "timed out",
    "Connection refused",
    "Connection reset",
    "connection closed",
    "error sending request",
    "stream closed",
];

/// Returns whether `error` is retryable under a predicate-or-substrings matcher.
///
/// The predicate, if present, decides alone. Otherwise the error message must
/// contain (case-sensitively) one of `substrings`.
pub fn matches_retryable(error: &TransportError, substrings: &[String], predicate: Option<&ErrorPredicate>) -> bool {
    match predicate {
        Some(predicate) => predicate(error),
        None => substrings.iter().any(|s| error.message().contains(s.as_str())),
    }
}

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryConfig {
    /// Attempt ceiling. The attempt numbered `max_retries` is final, so `0`
    /// and `1` both mean a single attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Caps exponential growth (before jitter).
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    /// Message fragments that mark an error as retryable.
    pub retryable_errors: Vec<String>,
    pub retryable_predicate: Option<ErrorPredicate>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable_errors: DEFAULT_RETRYABLE_ERRORS.iter().map(|s| s.to_string()).collect(),
            retryable_predicate: None,
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_errors", &self.retryable_errors)
            .field("retryable_predicate", &self.retryable_predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl RetryConfig {
    /// A config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
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

    /// Replaces the retryable message fragments.
    #[must_use]
    pub fn with_retryable_errors<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_errors = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Installs a custom classifier that overrides the message fragments.
    #[must_use]
    pub fn with_retryable_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TransportError) -> bool + Send + Sync + 'static,
    {
        self.retryable_predicate = Some(Arc::new(predicate));
        self
    }
}

/// Decides whether and when a failed attempt is retried.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay to wait after the failed attempt numbered `attempt` (1-based).
    pub fn get_delay(&self, attempt: u32) -> Duration {
        backoff::delay(
            attempt,
            self.config.base_delay,
            self.config.max_delay,
            self.config.backoff_multiplier,
            self.config.jitter,
        )
    }

    pub fn is_retryable_error(&self, error: &TransportError) -> bool {
        matches_retryable(error, &self.config.retryable_errors, self.config.retryable_predicate.as_ref())
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// `op` receives the 1-based attempt number. Only the last attempt's error
    /// is returned.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<T, NetError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        self.execute_with_cancel(&CancellationToken::new(), op).await
    }

    /// Like [`execute`](Self::execute), but stops with [`NetError::Cancelled`]
    /// as soon as `cancel` fires, whether an attempt or a wait is in flight.
    pub async fn execute_with_cancel<F, Fut, T>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, NetError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt: u32 = 1;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NetError::Cancelled),
                outcome = op(attempt) => outcome,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.config.max_retries {
                log::debug!("attempt {attempt} failed, no attempts left: {error}");
                return Err(NetError::Transport(error));
            }
            if !self.is_retryable_error(&error) {
                log::debug!("attempt {attempt} failed with a non-retryable error: {error}");
                return Err(NetError::Transport(error));
            }

            let wait = self.get_delay(attempt);
            log::debug!("attempt {attempt} failed ({error}), retrying in {wait:?}");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NetError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            attempt += 1;
        }
    }
}
