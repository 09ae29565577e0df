//! # Feed Indexer
//!
//! Main library for the feed batch indexer.
//!
//! This crate provides the entry point and configuration for running the
//! indexer pipeline.

pub mod config;

pub use config::{Dependencies, IndexerSettings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] feed_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] feed_indexer_repository::SearchIndexError),
}

impl From<feed_indexer_shared::InvalidSetting> for IndexingError {
    fn from(err: feed_indexer_shared::InvalidSetting) -> Self {
        Self::ConfigError(err.0)
    }
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
