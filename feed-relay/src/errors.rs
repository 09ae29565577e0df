use thiserror::Error;

/// Errors raised by the feed relay.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The feed connection failed or the stream broke.
    #[error("Feed error: {0}")]
    FeedError(String),

    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// The relay task ended without reporting a result.
    #[error("Relay task cancelled")]
    Cancelled,
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn feed(msg: impl Into<String>) -> Self {
        Self::FeedError(msg.into())
    }

    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }
}

impl From<feed_indexer_shared::InvalidSetting> for RelayError {
    fn from(err: feed_indexer_shared::InvalidSetting) -> Self {
        Self::ConfigError(err.0)
    }
}

impl From<rdkafka::error::KafkaError> for RelayError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::FeedError(err.to_string())
    }
}
