//! Error types for the network policy layer.
//!
//! Only terminal conditions surface as [`NetError`]. Recoverable conditions
//! (a cache miss caused by a malformed entry, a single bad `Set-Cookie`, an
//! unknown SSE field) are logged and swallowed by the component that hits them.

use std::fmt;

/// Broad category of a transport failure.
///
/// This is informational only: retry and reconnect decisions look at the
/// error *message*, never at the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not establish a connection.
    Connect,
    /// The transfer did not finish within its timeout.
    Timeout,
    /// The server answered with an unusable status code.
    Status(u16),
    /// Reading the response body failed midway.
    Body,
    /// The peer closed a long-lived stream.
    Closed,
    Other,
}

/// A failed transport call, carrying the message text the policies classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Failure for a response whose status code cannot be used (e.g. a non-2xx
    /// answer to an SSE connect).
    pub fn status(status: u16) -> Self {
        let reason = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        Self::new(
            TransportErrorKind::Status(status),
            format!("unexpected status {status} {reason}"),
        )
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Closed, message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Errors surfaced to the original caller or stream consumer.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The final attempt's real transport error (retries exhausted or the
    /// error was not retryable).
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("reconnect gave up after {attempts} attempts: {last_error}")]
    ReconnectExhausted {
        attempts: u32,
        last_error: TransportError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("cookie store error: {0}")]
    CookieStore(#[from] CookieStoreError),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Why a single `Set-Cookie` header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieParseError {
    #[error("Set-Cookie header has no name=value pair")]
    MissingPair,

    #[error("Set-Cookie header has an empty cookie name")]
    EmptyName,

    #[error("invalid Max-Age value: {0}")]
    InvalidMaxAge(String),

    #[error("cookie domain {domain} does not match request host {host}")]
    DomainMismatch { domain: String, host: String },
}

/// Failures reading or writing the on-disk cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieStoreError {
    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cookie file serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_its_message_verbatim() {
        let err = TransportError::timeout("operation timed out");
        assert_eq!(err.to_string(), "operation timed out");
        assert_eq!(err.kind, TransportErrorKind::Timeout);
    }

    #[test]
    fn status_error_includes_reason_phrase() {
        let err = TransportError::status(503);
        assert_eq!(err.kind, TransportErrorKind::Status(503));
        assert_eq!(err.message(), "unexpected status 503 Service Unavailable");
    }

    #[test]
    fn net_error_surfaces_the_real_transport_message() {
        let err: NetError = TransportError::connect("Connection refused").into();
        assert_eq!(err.to_string(), "Connection refused");
    }

    #[test]
    fn reconnect_exhausted_is_distinct() {
        let err = NetError::ReconnectExhausted {
            attempts: 3,
            last_error: TransportError::closed("stream closed by server"),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("stream closed by server"));
    }
}
