//! Long-lived SSE stream driver.
//!
//! [`EventSource::connect`] spawns a task that opens the stream, feeds body
//! chunks through an [`SseParser`] and reconnects according to the stream's
//! [`SseConnectionState`]. The consumer reads [`SseMessage`]s from a bounded
//! channel. Dropping or closing the `EventSource` cancels the task, including
//! any pending reconnect timer, and the partial event in the parser is
//! discarded.

use std::sync::Arc;

use futures::StreamExt;
use http::header::COOKIE;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cookies::{read_jar, write_jar, CookieJarHandle};
use crate::errors::{NetError, TransportError};
use crate::net::{insert_header, Request, Transport};
use crate::sse::{SseConnectionState, SseEvent, SseParser, StreamId};

const CHANNEL_CAPACITY: usize = 64;

/// What an [`EventSource`] reports to its consumer.
#[derive(Debug)]
pub enum SseMessage {
    /// A connection (first or reconnect) was established.
    Open,
    Event(SseEvent),
    /// A connection failed or dropped; a reconnect may follow.
    Error(TransportError),
    /// The stream gave up. Nothing follows.
    Terminated(NetError),
}

/// Consumer side of a running SSE stream.
pub struct EventSource {
    id: StreamId,
    receiver: mpsc::Receiver<SseMessage>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventSource {
    /// Starts driving `state` over `transport` on the current tokio runtime.
    ///
    /// With a cookie jar, each connect attaches its cookies and ingests the
    /// `Set-Cookie` headers of the stream response.
    pub fn connect<T>(transport: Arc<T>, state: SseConnectionState, cookies: Option<CookieJarHandle>) -> Self
    where
        T: Transport + ?Sized + 'static,
    {
        let id = StreamId::new();
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let driver = StreamDriver {
            id,
            transport,
            state,
            parser: SseParser::new(),
            cookies,
            sender,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            id,
            receiver,
            cancel,
            task,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Next message, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<SseMessage> {
        self.receiver.recv().await
    }

    /// Cancels the stream. Buffered partial data is discarded.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Token that cancels this stream when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Outcome of a single connection.
enum Connection {
    /// Cancelled, or the consumer went away.
    Stopped,
    /// The server answered 204: the stream is over for good.
    NoContent,
    Failed(TransportError),
}

struct StreamDriver<T: ?Sized> {
    id: StreamId,
    transport: Arc<T>,
    state: SseConnectionState,
    parser: SseParser,
    cookies: Option<CookieJarHandle>,
    sender: mpsc::Sender<SseMessage>,
    cancel: CancellationToken,
}

impl<T: Transport + ?Sized> StreamDriver<T> {
    async fn run(mut self) {
        log::debug!("[{}] opening {}", self.id, self.state.url());

        loop {
            let error = match self.connect_once().await {
                Connection::Stopped => {
                    self.parser.discard();
                    log::debug!("[{}] stream stopped", self.id);
                    return;
                }
                Connection::NoContent => {
                    log::debug!("[{}] server sent 204, closing stream", self.id);
                    return;
                }
                Connection::Failed(error) => error,
            };

            log::debug!("[{}] connection failed: {error}", self.id);
            if !self.emit(SseMessage::Error(error.clone())).await {
                return;
            }

            // A non-retryable error wins over an exhausted budget.
            if !self.state.config().enabled || !self.state.is_retryable_error(&error) {
                self.emit(SseMessage::Terminated(NetError::Transport(error))).await;
                return;
            }
            if self.state.attempts_exhausted() {
                let attempts = self.state.attempt_count();
                log::warn!("[{}] giving up after {attempts} reconnect attempts", self.id);
                self.emit(SseMessage::Terminated(NetError::ReconnectExhausted {
                    attempts,
                    last_error: error,
                }))
                .await;
                return;
            }

            self.state.increment_attempt();
            let wait = self.state.get_reconnect_delay();
            log::debug!(
                "[{}] reconnect attempt {} in {wait:?}",
                self.id,
                self.state.attempt_count()
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.parser.discard();
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn connect_once(&mut self) -> Connection {
        let request = self.build_request();

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Connection::Stopped,
            opened = self.transport.open_stream(request) => opened,
        };
        let mut response = match opened {
            Ok(response) => response,
            Err(error) => return Connection::Failed(error),
        };

        if response.status == 204 {
            return Connection::NoContent;
        }
        if !(200..300).contains(&response.status) {
            return Connection::Failed(TransportError::status(response.status));
        }

        if let Some(jar) = &self.cookies {
            write_jar(jar).store_response_cookies(&response.url, &response.headers);
        }

        self.state.reset_attempts();
        if !self.emit(SseMessage::Open).await {
            return Connection::Stopped;
        }

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Connection::Stopped,
                chunk = response.body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for event in self.parser.feed(&bytes) {
                        if !self.deliver(event).await {
                            return Connection::Stopped;
                        }
                    }
                }
                Some(Err(error)) => {
                    self.parser.discard();
                    return Connection::Failed(error);
                }
                None => {
                    if let Some(event) = self.parser.finish() {
                        if !self.deliver(event).await {
                            return Connection::Stopped;
                        }
                    }
                    return Connection::Failed(TransportError::closed("stream closed by server"));
                }
            }
        }
    }

    fn build_request(&self) -> Request {
        let mut request = self.state.request();
        if let Some(jar) = &self.cookies {
            let header = read_jar(jar).get_request_cookies(&request.url);
            if let Some(header) = header {
                insert_header(&mut request.headers, COOKIE, &header);
            }
        }
        request
    }

    async fn deliver(&mut self, event: SseEvent) -> bool {
        self.state.observe(&event);
        log::trace!("[{}] event {:?} id={:?}", self.id, event.event_type(), event.id);
        self.emit(SseMessage::Event(event)).await
    }

    /// Sends to the consumer. Returns `false` if cancelled or nobody listens.
    async fn emit(&self, message: SseMessage) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.sender.send(message) => sent.is_ok(),
        }
    }
}
