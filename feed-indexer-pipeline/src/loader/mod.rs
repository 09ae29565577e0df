//! Loader module for the feed indexer pipeline.
//!
//! Upserts processed records into the search index.

use std::sync::Arc;
use std::time::Duration;

use serde_json::value::RawValue;
use tracing::{debug, error, instrument, warn};

use crate::errors::PipelineError;
use crate::processor::{ProcessedRecord, RecordPosition};
use feed_indexer_repository::{SearchIndexError, SearchIndexProvider, UpsertResponse};
use feed_indexer_shared::DocumentId;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of retry attempts for a transient upsert failure.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

/// A record whose upsert failed after retries.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub position: RecordPosition,
    pub id: DocumentId,
    pub error: SearchIndexError,
}

/// Outcome of loading one batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Records upserted successfully.
    pub indexed: usize,
    /// Records skipped by the processor.
    pub skipped: usize,
    /// Records whose upsert failed, in batch order.
    pub failures: Vec<RecordFailure>,
}

impl LoadReport {
    /// Whether every indexable record was applied.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Whether the index had to be created during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Existing,
    Created,
}

/// Loader that upserts documents into the search index.
pub struct SearchLoader {
    client: Arc<dyn SearchIndexProvider>,
    index_name: String,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader writing to `index_name`.
    pub fn new(client: Arc<dyn SearchIndexProvider>, index_name: impl Into<String>) -> Self {
        Self {
            client,
            index_name: index_name.into(),
            config: LoaderConfig::default(),
        }
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(
        client: Arc<dyn SearchIndexProvider>,
        index_name: impl Into<String>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            client,
            index_name: index_name.into(),
            config,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Upsert every indexable record, in order.
    ///
    /// A failed record does not stop the batch; it is reported in the
    /// returned `LoadReport` and the remaining records are still attempted.
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    pub async fn load(&self, records: &[ProcessedRecord]) -> LoadReport {
        let mut report = LoadReport::default();

        for record in records {
            match record {
                ProcessedRecord::Skipped { .. } => report.skipped += 1,
                ProcessedRecord::Index { position, id, body } => {
                    match self.upsert_with_retry(id, body).await {
                        Ok(response) => {
                            debug!(
                                doc_id = %response.id,
                                partition = position.partition,
                                offset = position.offset,
                                "Inserted 1 document into the index"
                            );
                            report.indexed += 1;
                        }
                        Err(e) => {
                            error!(
                                doc_id = %id,
                                topic = %position.topic,
                                partition = position.partition,
                                offset = position.offset,
                                error = %e,
                                "Failed to index document after retries"
                            );
                            report.failures.push(RecordFailure {
                                position: position.clone(),
                                id: id.clone(),
                                error: e,
                            });
                        }
                    }
                }
            }
        }

        report
    }

    /// Upsert a document with exponential backoff on transient errors.
    async fn upsert_with_retry(
        &self,
        id: &DocumentId,
        body: &RawValue,
    ) -> Result<UpsertResponse, SearchIndexError> {
        let mut delay_ms = self.config.initial_retry_delay_ms;
        let mut attempt = 0;

        loop {
            match self.client.upsert_document(&self.index_name, id, body).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(attempt = attempt, doc_id = %id, "Document index succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if !e.is_transient() => {
                    debug!(error = %e, "Non-retryable error encountered");
                    return Err(e);
                }
                Err(e) if attempt >= self.config.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    warn!(
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay_ms,
                        doc_id = %id,
                        error = %e,
                        "Document index failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(delay_ms.saturating_mul(2), self.config.max_retry_delay_ms);
                }
            }
        }
    }

    /// Ensure the target index exists, creating it if needed.
    ///
    /// Safe to call on every startup; an existing index is left untouched.
    pub async fn ensure_index(&self) -> Result<IndexStatus, PipelineError> {
        if self.client.index_exists(&self.index_name).await? {
            return Ok(IndexStatus::Existing);
        }

        self.client.create_index(&self.index_name).await?;
        Ok(IndexStatus::Created)
    }

    /// Check if the search engine is healthy.
    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        self.client
            .health_check()
            .await
            .map_err(|e| PipelineError::loader(e.to_string()))
    }
}
