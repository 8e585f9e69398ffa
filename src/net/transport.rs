use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::errors::TransportError;
use crate::net::{Request, Response, StreamingResponse};

/// Future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = BoxFuture<'a, Result<T, TransportError>>;

/// Body chunks of a streaming response.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Executes HTTP requests on behalf of the policy layer.
///
/// Failures are reported as a [`TransportError`]; retry and reconnect
/// decisions only look at its message. A non-2xx status is not a failure for
/// [`issue`](Transport::issue).
pub trait Transport: Send + Sync {
    /// Sends `request` and buffers the whole response.
    fn issue(&self, request: Request) -> TransportFuture<'_, Response>;

    /// Sends `request` and returns as soon as the response head is available.
    fn open_stream(&self, request: Request) -> TransportFuture<'_, StreamingResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn issue(&self, request: Request) -> TransportFuture<'_, Response> {
        (**self).issue(request)
    }

    fn open_stream(&self, request: Request) -> TransportFuture<'_, StreamingResponse> {
        (**self).open_stream(request)
    }
}
