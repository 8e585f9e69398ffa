//! HTTP response models.
//!
//! [`Response`] is a **fully buffered** response: final URL, status code and
//! reason, headers, and the raw body bytes. [`StreamingResponse`] carries the
//! same head but hands the body out as a byte stream, which is what SSE needs.
//!
//! ## Notes
//! - `headers` is an `http::HeaderMap`, so header names are case-insensitive.
//! - `status_text` is derived from the canonical reason phrase and is
//!   `"Unknown"` for non-standard codes.
use http::{HeaderMap, StatusCode};

use crate::net::ByteStream;

/// Simple structure for HTTP responses.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL of the response (after redirects, if any).
    pub url: url::Url,

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,

    /// Human-readable reason phrase (e.g., `"OK"`, `"Not Found"`).
    pub status_text: String,

    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,

    /// Raw response body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// Builds a response, deriving `status_text` from the status code.
    pub fn new(url: url::Url, status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            url,
            status,
            status_text: status_text(status),
            headers,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose body has not been read yet.
pub struct StreamingResponse {
    pub url: url::Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

pub(crate) fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_uses_canonical_reason() {
        let url = url::Url::parse("https://example.com/").unwrap();
        assert_eq!(Response::new(url.clone(), 404, HeaderMap::new(), Vec::new()).status_text, "Not Found");
        assert_eq!(Response::new(url, 599, HeaderMap::new(), Vec::new()).status_text, "Unknown");
    }
}
