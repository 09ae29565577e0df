//! Consumer cursor positions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::LogMessage;

/// Position of the consumer group in one topic partition.
///
/// `offset` is the next offset to consume, i.e. one past the last message
/// that was applied to the index. This is the value committed to the log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CursorPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl CursorPosition {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

/// Compute the commit positions covering every message in `messages`.
///
/// One position per (topic, partition), at the highest consumed offset + 1.
pub fn commit_positions(messages: &[LogMessage]) -> Vec<CursorPosition> {
    let mut highest: BTreeMap<(&str, i32), i64> = BTreeMap::new();

    for msg in messages {
        highest
            .entry((msg.topic.as_str(), msg.partition))
            .and_modify(|offset| *offset = (*offset).max(msg.offset))
            .or_insert(msg.offset);
    }

    highest
        .into_iter()
        .map(|((topic, partition), offset)| CursorPosition::new(topic, partition, offset + 1))
        .collect()
}
