//! Kafka consumer implementation for the feed indexer.
//!
//! Polls feed events from a Kafka topic in batches. Offsets are only ever
//! committed explicitly by the orchestrator.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tracing::{debug, info, instrument, warn};

use crate::consumer::LogConsumer;
use crate::errors::PipelineError;
use feed_indexer_shared::{CursorPosition, LogMessage};

/// How long a seek may block waiting for the broker.
const SEEK_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a consumer group with no committed offset starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOffsetReset {
    Earliest,
    Latest,
}

impl AutoOffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for AutoOffsetReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoOffsetReset {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(PipelineError::config(format!(
                "unknown auto offset reset policy '{}', expected 'earliest' or 'latest'",
                other
            ))),
        }
    }
}

/// Configuration for the Kafka consumer.
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    /// Kafka broker addresses (comma-separated).
    pub brokers: String,
    /// Consumer group ID.
    pub group_id: String,
    /// Topic carrying the feed events.
    pub topic: String,
    pub auto_offset_reset: AutoOffsetReset,
    /// Upper bound on messages returned by one poll.
    pub max_batch_size: usize,
    /// Once the first message of a batch arrived, how long to wait for
    /// each further message before closing the batch.
    pub batch_linger: Duration,
}

impl KafkaConsumerConfig {
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Self {
        Self {
            brokers: brokers.to_string(),
            group_id: group_id.to_string(),
            topic: topic.to_string(),
            auto_offset_reset: AutoOffsetReset::Latest,
            max_batch_size: 500,
            batch_linger: Duration::from_millis(50),
        }
    }
}

/// Kafka consumer for feed events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    config: KafkaConsumerConfig,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// Auto-commit is always disabled; the orchestrator commits after indexing.
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(PipelineError)` - If consumer creation fails
    pub fn new(config: KafkaConsumerConfig) -> Result<Self, PipelineError> {
        if config.max_batch_size == 0 {
            return Err(PipelineError::config("max_batch_size must be at least 1"));
        }

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", config.auto_offset_reset.as_str())
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| PipelineError::kafka(e.to_string()))?;

        info!(
            brokers = %config.brokers,
            group_id = %config.group_id,
            auto_offset_reset = %config.auto_offset_reset,
            "Created Kafka consumer"
        );

        Ok(Self { consumer, config })
    }

    fn to_log_message(msg: &BorrowedMessage<'_>) -> LogMessage {
        LogMessage {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            timestamp: msg
                .timestamp()
                .to_millis()
                .and_then(DateTime::from_timestamp_millis),
            payload: msg.payload().map(<[u8]>::to_vec),
        }
    }

    fn topic_partition_list(positions: &[CursorPosition]) -> Result<TopicPartitionList, PipelineError> {
        let mut tpl = TopicPartitionList::new();
        for position in positions {
            tpl.add_partition_offset(&position.topic, position.partition, Offset::Offset(position.offset))?;
        }
        Ok(tpl)
    }
}

#[async_trait]
impl LogConsumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), PipelineError> {
        self.consumer
            .subscribe(&[self.config.topic.as_str()])
            .map_err(|e| PipelineError::kafka(e.to_string()))?;

        info!(topic = %self.config.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<LogMessage>, PipelineError> {
        let first = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => return Ok(Vec::new()),
            Ok(Err(e)) => return Err(PipelineError::kafka(e.to_string())),
            Ok(Ok(msg)) => Self::to_log_message(&msg),
        };

        let mut batch = Vec::with_capacity(self.config.max_batch_size);
        batch.push(first);

        while batch.len() < self.config.max_batch_size {
            match tokio::time::timeout(self.config.batch_linger, self.consumer.recv()).await {
                Ok(Ok(msg)) => batch.push(Self::to_log_message(&msg)),
                Ok(Err(e)) => {
                    // Hand back what we have; the error resurfaces on the next poll.
                    warn!(error = %e, received = batch.len(), "Kafka error while filling batch");
                    break;
                }
                Err(_) => break,
            }
        }

        debug!(count = batch.len(), "Polled batch");
        Ok(batch)
    }

    async fn commit(&self, positions: &[CursorPosition]) -> Result<(), PipelineError> {
        let tpl = Self::topic_partition_list(positions)?;

        self.consumer
            .commit(&tpl, CommitMode::Sync)
            .map_err(|e| PipelineError::commit(e.to_string()))
    }

    async fn rewind(&self, positions: &[CursorPosition]) -> Result<(), PipelineError> {
        for position in positions {
            self.consumer
                .seek(
                    &position.topic,
                    position.partition,
                    Offset::Offset(position.offset),
                    SEEK_TIMEOUT,
                )
                .map_err(|e| {
                    PipelineError::kafka(format!(
                        "failed to seek {}/{} to offset {}: {}",
                        position.topic, position.partition, position.offset, e
                    ))
                })?;

            info!(
                topic = %position.topic,
                partition = position.partition,
                offset = position.offset,
                "Rewound partition for redelivery"
            );
        }
        Ok(())
    }
}
