//! Durable log consumer interface.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::PipelineError;
use feed_indexer_shared::{CursorPosition, LogMessage};

/// A consumer-group member reading from the durable log.
///
/// The orchestrator drives one instance sequentially: `poll_batch`, then
/// either `commit` or `rewind`. Implementations never commit on their own.
#[async_trait]
pub trait LogConsumer: Send + Sync {
    /// Join the consumer group for the configured topic.
    fn subscribe(&self) -> Result<(), PipelineError>;

    /// Wait up to `timeout` for a batch of messages.
    ///
    /// Messages of one partition are returned in offset order. An empty
    /// batch means nothing arrived before the timeout.
    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<LogMessage>, PipelineError>;

    /// Synchronously commit the given positions for the consumer group.
    ///
    /// Each position is the next offset to consume in its partition.
    async fn commit(&self, positions: &[CursorPosition]) -> Result<(), PipelineError>;

    /// Move the in-memory read position back so that the next poll
    /// redelivers each partition starting at the given offset.
    async fn rewind(&self, positions: &[CursorPosition]) -> Result<(), PipelineError>;
}
