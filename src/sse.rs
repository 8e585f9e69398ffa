//! Server-Sent Events: wire parsing, reconnect state and the stream driver.
//!
//! - [`SseParser`] turns arbitrarily chunked bytes into [`SseEvent`]s.
//! - [`SseConnectionState`] holds the sticky state of one logical stream
//!   (attempt counter, last event id, server retry override).
//! - [`EventSource`] runs a stream on a tokio task and reconnects it.

mod connection;
mod event;
mod event_source;
mod parser;

use std::fmt::Display;
use uuid::Uuid;

pub use connection::{ReconnectConfig, SseConnectionState};
pub use event::SseEvent;
pub use event_source::{EventSource, SseMessage};
pub use parser::SseParser;

/// Identifies one logical SSE stream across all of its reconnects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for StreamId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
