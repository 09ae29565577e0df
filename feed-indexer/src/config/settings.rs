//! Indexer settings read from the environment.

use std::env;
use std::time::Duration;

use feed_indexer_pipeline::consumer::AutoOffsetReset;
use feed_indexer_shared::{parse_var as parse, LogFormat};

use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "consumer-opensearch";

/// Default topic the relay produces to.
const DEFAULT_KAFKA_TOPIC: &str = "wikimedia_recentchange";

/// Default target index.
const DEFAULT_INDEX_NAME: &str = "wikimedia";

/// Everything the indexer reads from its environment.
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    pub opensearch_url: String,
    pub kafka_broker: String,
    pub kafka_group_id: String,
    pub kafka_topic: String,
    pub index_name: String,
    pub poll_timeout: Duration,
    pub max_batch_size: usize,
    pub auto_offset_reset: AutoOffsetReset,
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub max_consecutive_failed_cycles: u32,
    pub index_shards: u32,
    pub index_replicas: u32,
    pub log_format: LogFormat,
}

impl IndexerSettings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL, may embed `user:pass@` (default: http://localhost:9200)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: consumer-opensearch)
    /// - `KAFKA_TOPIC`: Topic to consume (default: wikimedia_recentchange)
    /// - `INDEX_NAME`: Target index (default: wikimedia)
    /// - `POLL_TIMEOUT_MS`: Poll wait (default: 3000)
    /// - `MAX_BATCH_SIZE`: Messages per cycle (default: 500)
    /// - `AUTO_OFFSET_RESET`: `earliest` or `latest` (default: latest)
    /// - `MAX_RETRIES`, `INITIAL_RETRY_DELAY_MS`, `MAX_RETRY_DELAY_MS`: upsert retry (default: 3, 100, 5000)
    /// - `MAX_CONSECUTIVE_FAILED_CYCLES`: failed cycles before exiting (default: 5)
    /// - `INDEX_SHARDS`, `INDEX_REPLICAS`: used when creating the index (default: 1, 1)
    /// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let settings = Self {
            opensearch_url: string("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            kafka_broker: string("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            kafka_group_id: string("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
            kafka_topic: string("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC),
            index_name: string("INDEX_NAME", DEFAULT_INDEX_NAME),
            poll_timeout: Duration::from_millis(parse(&lookup, "POLL_TIMEOUT_MS", 3000)?),
            max_batch_size: parse(&lookup, "MAX_BATCH_SIZE", 500)?,
            auto_offset_reset: match lookup("AUTO_OFFSET_RESET") {
                Some(value) => value.parse()?,
                None => AutoOffsetReset::Latest,
            },
            max_retries: parse(&lookup, "MAX_RETRIES", 3)?,
            initial_retry_delay_ms: parse(&lookup, "INITIAL_RETRY_DELAY_MS", 100)?,
            max_retry_delay_ms: parse(&lookup, "MAX_RETRY_DELAY_MS", 5000)?,
            max_consecutive_failed_cycles: parse(&lookup, "MAX_CONSECUTIVE_FAILED_CYCLES", 5)?,
            index_shards: parse(&lookup, "INDEX_SHARDS", 1)?,
            index_replicas: parse(&lookup, "INDEX_REPLICAS", 1)?,
            log_format: match lookup("LOG_FORMAT") {
                Some(value) => value.parse()?,
                None => LogFormat::Pretty,
            },
        };

        if settings.max_batch_size == 0 {
            return Err(IndexingError::config("MAX_BATCH_SIZE must be at least 1"));
        }
        if settings.max_consecutive_failed_cycles == 0 {
            return Err(IndexingError::config(
                "MAX_CONSECUTIVE_FAILED_CYCLES must be at least 1",
            ));
        }
        if settings.kafka_topic.trim().is_empty() || settings.index_name.trim().is_empty() {
            return Err(IndexingError::config("KAFKA_TOPIC and INDEX_NAME must not be empty"));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<IndexerSettings, IndexingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IndexerSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.opensearch_url, "http://localhost:9200");
        assert_eq!(settings.kafka_group_id, "consumer-opensearch");
        assert_eq!(settings.kafka_topic, "wikimedia_recentchange");
        assert_eq!(settings.index_name, "wikimedia");
        assert_eq!(settings.poll_timeout, Duration::from_millis(3000));
        assert_eq!(settings.auto_offset_reset, AutoOffsetReset::Latest);
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("KAFKA_TOPIC", "changes"),
            ("POLL_TIMEOUT_MS", "250"),
            ("MAX_BATCH_SIZE", "10"),
            ("AUTO_OFFSET_RESET", "earliest"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(settings.kafka_topic, "changes");
        assert_eq!(settings.poll_timeout, Duration::from_millis(250));
        assert_eq!(settings.max_batch_size, 10);
        assert_eq!(settings.auto_offset_reset, AutoOffsetReset::Earliest);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            settings(&[("POLL_TIMEOUT_MS", "soon")]),
            Err(IndexingError::ConfigError(_))
        ));
        assert!(matches!(
            settings(&[("MAX_BATCH_SIZE", "0")]),
            Err(IndexingError::ConfigError(_))
        ));
        assert!(matches!(
            settings(&[("AUTO_OFFSET_RESET", "none")]),
            Err(IndexingError::PipelineError(_))
        ));
    }
}
