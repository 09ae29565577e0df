//! Consumer module for the feed indexer pipeline.
//!
//! Provides the log consumer interface and its Kafka implementation.

mod kafka_consumer;
mod log_consumer;

pub use kafka_consumer::{AutoOffsetReset, KafkaConsumer, KafkaConsumerConfig};
pub use log_consumer::LogConsumer;
