//! Error types for the feed indexer pipeline.

use feed_indexer_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur in the feed indexer pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Kafka-related error (subscribe, poll, seek).
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Committing consumer offsets failed.
    #[error("Commit error: {0}")]
    CommitError(String),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Error from the search index.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchIndexError),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Too many cycles in a row failed to index their batch.
    #[error("{cycles} consecutive cycles failed, last error: {last_error}")]
    FailedCycles { cycles: u32, last_error: String },
}

impl PipelineError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a commit error.
    pub fn commit(msg: impl Into<String>) -> Self {
        Self::CommitError(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for PipelineError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
