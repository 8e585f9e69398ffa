//! Incremental `text/event-stream` parser.
//!
//! Bytes are appended to an internal buffer that persists across
//! [`SseParser::feed`] calls, so fields and events split across network
//! chunks parse the same as contiguous input. Only complete lines are
//! decoded; a trailing partial line stays buffered until more bytes arrive or
//! the stream ends ([`SseParser::finish`]).
//!
//! Lines end at `\n`; a `\r` directly before it is dropped, so `\r\n` and
//! `\n` parse alike. A lone `\r` is ordinary value text.

use std::mem;

use crate::sse::SseEvent;

/// Fields collected for the event currently being assembled.
#[derive(Debug, Default)]
struct PendingEvent {
    id: Option<String>,
    event: Option<String>,
    data: Option<Vec<String>>,
    retry: Option<u64>,
    raw_fields: Vec<(String, String)>,
}

impl PendingEvent {
    fn is_empty(&self) -> bool {
        self.raw_fields.is_empty()
    }
}

/// Stateful SSE parser for a single logical stream.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already scanned without finding a `\n`.
    scanned: usize,
    pending: PendingEvent,
    last_event_id: Option<String>,
    retry: Option<u64>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every event completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start + self.scanned..].iter().position(|&b| b == b'\n') {
            let end = start + self.scanned + offset;
            let raw = &self.buffer[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

            let line = String::from_utf8_lossy(raw).into_owned();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }

            start = end + 1;
            self.scanned = 0;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        events
    }

    /// Ends the stream: any unterminated line is processed and the pending
    /// event is dispatched if it has at least one field.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let mut rest = mem::take(&mut self.buffer);
        self.scanned = 0;
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        if !rest.is_empty() {
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(&line);
        }
        self.dispatch()
    }

    /// Drops buffered bytes and the partial event without dispatching them.
    /// Sticky state (last event id, retry) is kept.
    pub fn discard(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.pending = PendingEvent::default();
    }

    /// The most recent non-empty event id seen on this stream.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// The most recent valid `retry` value seen on this stream, in milliseconds.
    pub fn retry(&self) -> Option<u64> {
        self.retry
    }

    /// Whether unterminated bytes or a partially assembled event are buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || !self.pending.is_empty()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match name {
            "id" => self.pending.id = Some(value.to_string()),
            "event" => self.pending.event = Some(value.to_string()),
            "data" => self.pending.data.get_or_insert_with(Vec::new).push(value.to_string()),
            "retry" => match value.parse::<u64>() {
                Ok(ms) => self.pending.retry = Some(ms),
                Err(_) => {
                    log::trace!("ignoring invalid retry field {value:?}");
                    return None;
                }
            },
            other => log::trace!("unknown SSE field {other:?}"),
        }

        self.pending.raw_fields.push((name.to_string(), value.to_string()));
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let pending = mem::take(&mut self.pending);
        if pending.is_empty() {
            return None;
        }

        if let Some(id) = &pending.id {
            self.last_event_id = if id.is_empty() { None } else { Some(id.clone()) };
        }
        if let Some(retry) = pending.retry {
            self.retry = Some(retry);
        }

        Some(SseEvent {
            id: pending.id,
            event: pending.event,
            data: pending.data.map(|lines| lines.join("\n")),
            retry: pending.retry,
            raw_fields: pending.raw_fields,
        })
    }
}
