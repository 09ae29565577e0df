//! Document processor implementation.
//!
//! Turns log messages into documents ready for upsert. The document id comes
//! from the payload's `meta.id` field; a record without a usable id is
//! skipped rather than failing the batch.

use serde_json::{value::RawValue, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use feed_indexer_shared::{CursorPosition, DocumentId, LogMessage};

/// Characters of payload included in skip warnings.
const EXCERPT_CHARS: usize = 120;

/// Why a record was not indexed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("message has no payload")]
    EmptyPayload,

    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload has no meta.id field")]
    MissingIdentity,

    #[error("meta.id is not a usable identity: {0}")]
    InvalidIdentity(String),
}

/// Location of a single record in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl RecordPosition {
    /// Cursor that makes the log redeliver this record next.
    pub fn redelivery_cursor(&self) -> CursorPosition {
        CursorPosition::new(self.topic.clone(), self.partition, self.offset)
    }
}

impl From<&LogMessage> for RecordPosition {
    fn from(msg: &LogMessage) -> Self {
        Self {
            topic: msg.topic.clone(),
            partition: msg.partition,
            offset: msg.offset,
        }
    }
}

/// Processed result for one log message.
#[derive(Debug)]
pub enum ProcessedRecord {
    /// Document to be upserted under `id`.
    Index {
        position: RecordPosition,
        id: DocumentId,
        body: Box<RawValue>,
    },
    /// Record dropped before indexing.
    Skipped {
        position: RecordPosition,
        reason: SkipReason,
    },
}

/// Extract the document identity from a payload.
///
/// Returns the identity together with the payload as an unmodified JSON
/// body. String ids are used as-is; numeric ids are rendered in their JSON
/// form.
pub fn extract_identity(payload: &str) -> Result<(DocumentId, Box<RawValue>), SkipReason> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| SkipReason::InvalidJson(e.to_string()))?;

    let id = match value.get("meta").and_then(|meta| meta.get("id")) {
        None | Some(Value::Null) => return Err(SkipReason::MissingIdentity),
        Some(Value::String(s)) => DocumentId::new(s.as_str())
            .ok_or_else(|| SkipReason::InvalidIdentity("blank string".to_string()))?,
        Some(Value::Number(n)) => DocumentId::new(n.to_string())
            .ok_or_else(|| SkipReason::InvalidIdentity("blank number".to_string()))?,
        Some(other) => {
            return Err(SkipReason::InvalidIdentity(format!(
                "expected string or number, got {}",
                json_type(other)
            )))
        }
    };

    let body = RawValue::from_string(payload.to_string())
        .map_err(|e| SkipReason::InvalidJson(e.to_string()))?;

    Ok((id, body))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Processor that maps log messages to upsert-ready documents.
#[derive(Debug, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Create a new document processor.
    pub fn new() -> Self {
        Self
    }

    /// Process a batch of log messages, preserving their order.
    ///
    /// Every message yields exactly one record, either indexable or skipped.
    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    pub fn process_batch(&self, messages: &[LogMessage]) -> Vec<ProcessedRecord> {
        let processed: Vec<ProcessedRecord> =
            messages.iter().map(|msg| self.process_message(msg)).collect();

        debug!(processed_count = processed.len(), "Processed message batch");
        processed
    }

    /// Process a single log message.
    pub fn process_message(&self, msg: &LogMessage) -> ProcessedRecord {
        let position = RecordPosition::from(msg);

        let result = match msg.payload.as_deref().map(std::str::from_utf8) {
            None => Err(SkipReason::EmptyPayload),
            Some(Err(e)) => Err(SkipReason::InvalidUtf8(e.to_string())),
            Some(Ok(payload)) if payload.trim().is_empty() => Err(SkipReason::EmptyPayload),
            Some(Ok(payload)) => extract_identity(payload),
        };

        match result {
            Ok((id, body)) => ProcessedRecord::Index { position, id, body },
            Err(reason) => {
                warn!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    reason = %reason,
                    payload = %msg.excerpt(EXCERPT_CHARS),
                    "Skipping record"
                );
                ProcessedRecord::Skipped { position, reason }
            }
        }
    }
}
