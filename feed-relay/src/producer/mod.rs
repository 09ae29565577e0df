//! Publishing side of the relay.

mod kafka_publisher;

pub use kafka_publisher::KafkaPublisher;

use std::time::Duration;

use async_trait::async_trait;

use crate::RelayError;

/// A sink that accepts payloads for a topic without waiting for delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue `payload` for `topic`. Resolves once the record is buffered,
    /// which only takes time while the local send queue is full.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError>;

    /// Wait until everything buffered so far is delivered or `timeout` passes.
    async fn flush(&self, timeout: Duration) -> Result<(), RelayError>;
}
