use std::time::Duration;

use http::header::HeaderName;
use http::{HeaderMap, Method};
use url::Url;

use crate::net::insert_header;

/// An outgoing HTTP request as handed to a [`Transport`](crate::net::Transport).
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Upper bound for the whole transfer. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Sets a header; invalid values are logged and skipped.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        insert_header(&mut self.headers, name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
