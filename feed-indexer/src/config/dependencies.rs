//! Dependency initialization and wiring for the feed indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::IndexerSettings;
use crate::IndexingError;
use feed_indexer_pipeline::{
    consumer::{KafkaConsumer, KafkaConsumerConfig},
    loader::{LoaderConfig, SearchLoader},
    orchestrator::{Orchestrator, OrchestratorConfig},
    processor::DocumentProcessor,
};
use feed_indexer_repository::{OpenSearchClient, SearchIndexConfig};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Build the search client, the Kafka consumer and the orchestrator
    /// that owns both.
    ///
    /// Nothing here talks to the network yet; reachability is checked when
    /// the orchestrator starts.
    pub async fn new(settings: &IndexerSettings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            kafka_broker = %settings.kafka_broker,
            kafka_group_id = %settings.kafka_group_id,
            kafka_topic = %settings.kafka_topic,
            index = %settings.index_name,
            "Initializing dependencies"
        );

        let search_client = OpenSearchClient::new(
            &settings.opensearch_url,
            SearchIndexConfig::new(settings.index_shards, settings.index_replicas),
        )
        .await
        .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let mut consumer_config = KafkaConsumerConfig::new(
            &settings.kafka_broker,
            &settings.kafka_group_id,
            &settings.kafka_topic,
        );
        consumer_config.auto_offset_reset = settings.auto_offset_reset;
        consumer_config.max_batch_size = settings.max_batch_size;

        let consumer = KafkaConsumer::new(consumer_config)
            .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        let loader = SearchLoader::with_config(
            Arc::new(search_client),
            settings.index_name.clone(),
            LoaderConfig {
                max_retries: settings.max_retries,
                initial_retry_delay_ms: settings.initial_retry_delay_ms,
                max_retry_delay_ms: settings.max_retry_delay_ms,
            },
        );

        let orchestrator = Orchestrator::with_config(
            Box::new(consumer),
            DocumentProcessor::new(),
            loader,
            OrchestratorConfig {
                poll_timeout: settings.poll_timeout,
                max_consecutive_failed_cycles: settings.max_consecutive_failed_cycles,
                ..OrchestratorConfig::default()
            },
        );

        Ok(Self { orchestrator })
    }
}
