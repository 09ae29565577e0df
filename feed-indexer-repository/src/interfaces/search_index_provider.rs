//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;
use serde_json::value::RawValue;

use crate::errors::SearchIndexError;
use crate::types::UpsertResponse;
use feed_indexer_shared::DocumentId;

/// Abstracts the underlying search index implementation.
///
/// Implementations are constructed once at startup and injected into the
/// indexer as `Arc<dyn SearchIndexProvider>`, which also allows tests to swap
/// in an in-memory index.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check whether the named index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index exists
    /// * `Ok(false)` - If it does not
    /// * `Err(SearchIndexError)` - If the check could not be performed
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError>;

    /// Create the named index.
    ///
    /// Creating an index that already exists is not an error.
    async fn create_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Create or overwrite the document addressed by `id` with `body`.
    ///
    /// The body is sent as JSON exactly as given. Upserting the same id twice
    /// leaves exactly one document holding the latest body.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index name
    /// * `id` - Document identity
    /// * `body` - Raw JSON document
    ///
    /// # Returns
    ///
    /// * `Ok(UpsertResponse)` - The id the engine assigned and the write result
    /// * `Err(SearchIndexError)` - If the write failed
    async fn upsert_document(
        &self,
        index: &str,
        id: &DocumentId,
        body: &RawValue,
    ) -> Result<UpsertResponse, SearchIndexError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is reachable but unhealthy
    /// * `Err(SearchIndexError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
