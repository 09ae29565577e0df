//! Incremental `text/event-stream` decoder.

use std::time::Duration;

use feed_indexer_shared::FeedEvent;

/// Turns arbitrary byte chunks into dispatched [`FeedEvent`]s.
///
/// Chunk boundaries may fall anywhere, including inside a UTF-8 sequence or
/// between the `\r` and `\n` of a line ending.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    /// The previous chunk ended on `\r`; a leading `\n` belongs to that line ending.
    after_cr: bool,
    data: String,
    event_type: Option<String>,
    /// Latest `id:` read, including one whose event is still incomplete.
    id_buffer: Option<String>,
    /// Id as of the last completed event.
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk and return every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<FeedEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }

            match byte {
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let line = std::mem::take(&mut self.line);
                    if let Some(event) = self.process_line(&String::from_utf8_lossy(&line)) {
                        events.push(event);
                    }
                }
                _ => self.line.push(byte),
            }
        }

        events
    }

    /// The id in effect when the last event was completed, carried across
    /// events. An `id:` line only takes effect once its event ends.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// The reconnection delay requested by the server since the last call.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    fn process_line(&mut self, line: &str) -> Option<FeedEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event_type = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id_buffer = Some(value.to_string()),
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<FeedEvent> {
        self.last_event_id = self.id_buffer.clone();
        let event_type = self.event_type.take();
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();

        Some(FeedEvent {
            event_type,
            id: self.last_event_id.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<FeedEvent> {
        let mut decoder = SseDecoder::new();
        chunks.iter().flat_map(|chunk| decoder.feed(chunk)).collect()
    }

    #[test]
    fn test_single_event() {
        let events = decode_all(&[b"event: message\nid: 42\ndata: {\"a\":1}\n\n"]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type.as_deref(), Some("message"));
        assert_eq!(events[0].id.as_deref(), Some("42"));
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn test_multiline_data_is_joined_with_newlines() {
        let events = decode_all(&[b"data: first\ndata:second\ndata:  third\n\n"]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond\n third");
    }

    #[test]
    fn test_line_endings() {
        let events = decode_all(&[b"data: crlf\r\n\r\ndata: cr\r\rdata: lf\n\n"]);

        let data: Vec<_> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["crlf", "cr", "lf"]);
    }

    #[test]
    fn test_chunks_split_anywhere() {
        let events = decode_all(&[b"da", b"ta: caf\xc3", b"\xa9\r", b"\n", b"\r\n"]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "café");
    }

    #[test]
    fn test_comments_and_empty_events_are_ignored() {
        let events = decode_all(&[b": keepalive\n\nevent: ping\n\nunknown: x\n\ndata: real\n\n"]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
        assert_eq!(events[0].event_type, None);
    }

    #[test]
    fn test_incomplete_event_is_held_back() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"data: pending\n").is_empty());
        let events = decoder.feed(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "pending");
    }

    #[test]
    fn test_id_persists_and_retry_is_reported() {
        let mut decoder = SseDecoder::new();

        let events = decoder.feed(b"id: 7\nretry: 2500\ndata: a\n\ndata: b\n\nretry: soon\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].id.as_deref(), Some("7"));
        assert_eq!(decoder.last_event_id(), Some("7"));
        assert_eq!(decoder.take_retry(), Some(Duration::from_millis(2500)));
        assert_eq!(decoder.take_retry(), None);
    }

    #[test]
    fn test_id_of_incomplete_event_is_not_reported() {
        let mut decoder = SseDecoder::new();

        let events = decoder.feed(b"id: 1\ndata: a\n\nid: 2\ndata: b\n");

        assert_eq!(events.len(), 1);
        assert_eq!(decoder.last_event_id(), Some("1"));

        let events = decoder.feed(b"\n");
        assert_eq!(events[0].id.as_deref(), Some("2"));
        assert_eq!(decoder.last_event_id(), Some("2"));
    }

    #[test]
    fn test_data_field_without_value_dispatches_empty_payload() {
        let events = decode_all(&[b"data\n\n"]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "");
    }
}
