//! [`Transport`] implementation over `reqwest`.
use std::error::Error as _;
use std::time::Duration;

use futures::StreamExt;

use crate::errors::{TransportError, TransportErrorKind};
use crate::net::response::status_text;
use crate::net::{Request, Response, StreamingResponse, Transport, TransportFuture};

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport sending `user_agent` on every request.
    ///
    /// There is no client-wide timeout: long-lived streams must not be cut
    /// off, so timeouts are applied per request instead.
    pub fn new(user_agent: &str, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: Request) -> Result<reqwest::Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder.send().await.map_err(map_reqwest_error)
    }
}

impl Transport for ReqwestTransport {
    fn issue(&self, request: Request) -> TransportFuture<'_, Response> {
        Box::pin(async move {
            let res = self.send(request).await?;
            let status = res.status().as_u16();
            let url = res.url().clone();
            let headers = res.headers().clone();
            let body = res.bytes().await.map_err(map_reqwest_error)?.to_vec();

            log::trace!("{status} {url} ({} bytes)", body.len());

            Ok(Response {
                url,
                status,
                status_text: status_text(status),
                headers,
                body,
            })
        })
    }

    fn open_stream(&self, request: Request) -> TransportFuture<'_, StreamingResponse> {
        Box::pin(async move {
            let res = self.send(request).await?;
            let status = res.status().as_u16();
            let url = res.url().clone();
            let headers = res.headers().clone();
            let body = res.bytes_stream().map(|chunk| chunk.map_err(map_reqwest_error)).boxed();

            Ok(StreamingResponse {
                url,
                status,
                headers,
                body,
            })
        })
    }
}

/// Flattens a reqwest error and its source chain into a [`TransportError`].
///
/// The message keeps the underlying causes ("Connection refused", ...) since
/// retry classification matches on it.
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    let kind = if e.is_timeout() {
        if !message.contains("timed out") {
            message.push_str(": operation timed out");
        }
        TransportErrorKind::Timeout
    } else if e.is_connect() {
        TransportErrorKind::Connect
    } else if e.is_body() || e.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Other
    };

    TransportError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_user_agent() {
        assert!(ReqwestTransport::new("gosub-net-test", Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn builder_errors_keep_their_message() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let mapped = map_reqwest_error(err);

        assert_eq!(mapped.kind, TransportErrorKind::Other);
        assert!(!mapped.message().is_empty());
    }
}
