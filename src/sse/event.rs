use std::fmt::Write as _;

/// One dispatched Server-Sent Event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    /// Event type; `None` means the default `"message"`.
    pub event: Option<String>,
    /// `data` lines joined with `\n`. `None` when the event had no data field.
    pub data: Option<String>,
    /// Reconnection time requested by the server, in milliseconds.
    pub retry: Option<u64>,
    /// Every accepted field occurrence, in wire order.
    pub raw_fields: Vec<(String, String)>,
}

impl SseEvent {
    /// A plain `message` event carrying `data`.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry_ms: u64) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// True for events without a meaningful payload (absent or blank data).
    pub fn is_keep_alive(&self) -> bool {
        self.data.as_deref().map_or(true, |d| d.trim().is_empty())
    }

    /// Returns the first raw value recorded for `field`.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.raw_fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Encodes the event in `text/event-stream` form, terminated by a blank line.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            let _ = writeln!(out, "id: {id}");
        }
        if let Some(event) = &self.event {
            let _ = writeln!(out, "event: {event}");
        }
        if let Some(retry) = self.retry {
            let _ = writeln!(out, "retry: {retry}");
        }
        if let Some(data) = &self.data {
            for line in data.split('\n') {
                let _ = writeln!(out, "data: {line}");
            }
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        let event = SseEvent::message("a\nb").with_id("7").with_event("update").with_retry(1500);
        assert_eq!(event.to_wire(), "id: 7\nevent: update\nretry: 1500\ndata: a\ndata: b\n\n");
    }

    #[test]
    fn keep_alive_detection() {
        assert!(SseEvent::default().with_id("1").is_keep_alive());
        assert!(SseEvent::message("  ").is_keep_alive());
        assert!(!SseEvent::message("x").is_keep_alive());
    }

    #[test]
    fn default_type_is_message() {
        assert_eq!(SseEvent::message("x").event_type(), "message");
        assert_eq!(SseEvent::message("x").with_event("ping").event_type(), "ping");
    }
}
