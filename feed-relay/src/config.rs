//! Relay settings read from the environment.

use std::env;
use std::time::Duration;

use feed_indexer_shared::{parse_var as parse, LogFormat};

use crate::RelayError;

/// Wikimedia's public recent-change stream.
const DEFAULT_FEED_URL: &str = "https://stream.wikimedia.org/v2/stream/recentchange";

const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

const DEFAULT_KAFKA_TOPIC: &str = "wikimedia_recentchange";

const COMPRESSION_CODECS: [&str; 5] = ["none", "gzip", "snappy", "lz4", "zstd"];

/// Producer throughput tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSettings {
    pub linger_ms: u64,
    pub batch_size: u64,
    pub compression: String,
    /// How long librdkafka keeps retrying a message before reporting failure.
    pub message_timeout_ms: u64,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            linger_ms: 20,
            batch_size: 32 * 1024,
            compression: "snappy".to_string(),
            message_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub feed_url: String,
    pub kafka_broker: String,
    pub kafka_topic: String,
    pub producer: ProducerSettings,
    /// Stop after this long. `None` runs until Ctrl-C.
    pub run_for: Option<Duration>,
    pub max_reconnect_delay: Duration,
    pub log_format: LogFormat,
}

impl RelaySettings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FEED_URL`: SSE endpoint (default: Wikimedia recent changes)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_TOPIC`: Destination topic (default: wikimedia_recentchange)
    /// - `PRODUCER_LINGER_MS`: (default: 20)
    /// - `PRODUCER_BATCH_SIZE`: bytes (default: 32768)
    /// - `PRODUCER_COMPRESSION`: none, gzip, snappy, lz4 or zstd (default: snappy)
    /// - `RELAY_RUN_SECS`: stop after this many seconds (default: unset)
    /// - `FEED_MAX_RECONNECT_DELAY_MS`: reconnect backoff cap (default: 30000)
    /// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = ProducerSettings::default();

        let producer = ProducerSettings {
            linger_ms: parse(&lookup, "PRODUCER_LINGER_MS", defaults.linger_ms)?,
            batch_size: parse(&lookup, "PRODUCER_BATCH_SIZE", defaults.batch_size)?,
            compression: string("PRODUCER_COMPRESSION", &defaults.compression)
                .trim()
                .to_ascii_lowercase(),
            message_timeout_ms: defaults.message_timeout_ms,
        };
        if !COMPRESSION_CODECS.contains(&producer.compression.as_str()) {
            return Err(RelayError::config(format!(
                "PRODUCER_COMPRESSION must be one of {:?}, got '{}'",
                COMPRESSION_CODECS, producer.compression
            )));
        }

        let run_for = match lookup("RELAY_RUN_SECS") {
            Some(raw) if !raw.trim().is_empty() => Some(Duration::from_secs(
                raw.trim()
                    .parse()
                    .map_err(|e| RelayError::config(format!("invalid RELAY_RUN_SECS='{}': {}", raw, e)))?,
            )),
            _ => None,
        };

        let settings = Self {
            feed_url: string("FEED_URL", DEFAULT_FEED_URL),
            kafka_broker: string("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            kafka_topic: string("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC),
            producer,
            run_for,
            max_reconnect_delay: Duration::from_millis(parse(
                &lookup,
                "FEED_MAX_RECONNECT_DELAY_MS",
                30_000,
            )?),
            log_format: match lookup("LOG_FORMAT") {
                Some(value) => value.parse()?,
                None => LogFormat::Pretty,
            },
        };

        if settings.kafka_topic.trim().is_empty() {
            return Err(RelayError::config("KAFKA_TOPIC must not be empty"));
        }

        Ok(settings)
    }
}
