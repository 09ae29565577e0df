//! Event and log message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event received from the push feed.
///
/// The payload is forwarded verbatim; the relay never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// The `event:` name, if the feed sent one.
    pub event_type: Option<String>,
    /// The `id:` of the event, if the feed sent one.
    pub id: Option<String>,
    /// The raw event payload.
    pub data: String,
}

impl FeedEvent {
    /// Create an unnamed event with the given payload.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event_type: None,
            id: None,
            data: data.into(),
        }
    }
}

/// A message read back from the durable log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub topic: String,
    pub partition: i32,
    /// Monotonic within a partition.
    pub offset: i64,
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw payload bytes, exactly as stored in the log. `None` when the
    /// record carried no value.
    pub payload: Option<Vec<u8>>,
}

impl LogMessage {
    /// Create a message without a timestamp.
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            timestamp: None,
            payload: Some(payload.into().into_bytes()),
        }
    }

    /// A short excerpt of the payload for log lines. Invalid UTF-8 is
    /// shown with replacement characters.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let Some(payload) = &self.payload else {
            return String::new();
        };

        let text = String::from_utf8_lossy(payload);
        if text.chars().count() > max_chars {
            let mut excerpt: String = text.chars().take(max_chars).collect();
            excerpt.push_str("...");
            excerpt
        } else {
            text.into_owned()
        }
    }
}
