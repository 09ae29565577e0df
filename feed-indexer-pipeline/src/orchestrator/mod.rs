//! Orchestrator module for the feed indexer pipeline.
//!
//! Runs the indexing cycle: poll a batch, upsert every record, then commit
//! the consumed offsets. The three steps never overlap, and a commit is only
//! issued after the whole batch has been indexed.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::LogConsumer;
use crate::errors::PipelineError;
use crate::loader::{IndexStatus, SearchLoader};
use crate::processor::DocumentProcessor;
use feed_indexer_shared::{commit_positions, CursorPosition, LogMessage};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long one poll waits for messages.
    pub poll_timeout: Duration,
    /// Failed cycles in a row tolerated before giving up.
    pub max_consecutive_failed_cycles: u32,
    /// Backoff after the first failed cycle, doubled for each further one.
    pub initial_failure_backoff: Duration,
    pub max_failure_backoff: Duration,
    /// Check search engine health before consuming.
    pub health_check_on_start: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(3000),
            max_consecutive_failed_cycles: 5,
            initial_failure_backoff: Duration::from_millis(500),
            max_failure_backoff: Duration::from_secs(30),
            health_check_on_start: true,
        }
    }
}

/// Summary of one poll-index-commit cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub polled: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Whether the batch's offsets were committed.
    pub committed: bool,
    /// Positions the consumer was rewound to after a failure.
    pub rewound: Vec<CursorPosition>,
}

impl CycleReport {
    /// A cycle fails when any record could not be indexed.
    pub fn is_failed(&self) -> bool {
        self.failed > 0
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// Owns the log consumer and the loader for its whole lifetime; nothing else
/// commits offsets for this consumer.
pub struct Orchestrator {
    consumer: Box<dyn LogConsumer>,
    processor: DocumentProcessor,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Box<dyn LogConsumer>,
        processor: DocumentProcessor,
        loader: SearchLoader,
    ) -> Self {
        Self::with_config(consumer, processor, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Box<dyn LogConsumer>,
        processor: DocumentProcessor,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            loader,
            config,
            shutdown_tx,
        }
    }

    /// Sender that stops `run` at the next cycle boundary.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// One-time startup: verify the search engine, ensure the index exists,
    /// and join the consumer group. Any failure here is fatal.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<(), PipelineError> {
        if self.config.health_check_on_start && !self.loader.health_check().await? {
            return Err(PipelineError::loader("search cluster is unhealthy"));
        }

        match self.loader.ensure_index().await? {
            IndexStatus::Created => info!(index = %self.loader.index_name(), "Index is created"),
            IndexStatus::Existing => info!(index = %self.loader.index_name(), "Index exists"),
        }
        self.consumer.subscribe()?;
        Ok(())
    }

    /// Run the orchestrator until shutdown or a fatal error.
    ///
    /// Shutdown is only observed between cycles and while waiting for a
    /// poll. A cycle that has started indexing always runs to its end, and
    /// no commit is issued for a cycle that did not finish.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        info!(index = %self.loader.index_name(), "Starting feed indexer orchestrator");

        self.init().await?;

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut consecutive_failures: u32 = 0;

        loop {
            let polled = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                polled = self.consumer.poll_batch(self.config.poll_timeout) => polled,
            };

            let failure = match polled {
                Ok(batch) => {
                    let report = self.process_batch(batch).await?;
                    if report.is_failed() {
                        Some(format!("{} records failed to index", report.failed))
                    } else {
                        None
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Poll failed");
                    Some(e.to_string())
                }
            };

            let Some(last_error) = failure else {
                consecutive_failures = 0;
                continue;
            };

            consecutive_failures += 1;
            if consecutive_failures >= self.config.max_consecutive_failed_cycles {
                error!(
                    cycles = consecutive_failures,
                    last_error = %last_error,
                    "Giving up after consecutive failed cycles"
                );
                return Err(PipelineError::FailedCycles {
                    cycles: consecutive_failures,
                    last_error,
                });
            }

            let backoff = self.failure_backoff(consecutive_failures);
            warn!(
                cycle_failures = consecutive_failures,
                backoff_ms = backoff.as_millis() as u64,
                "Cycle failed, backing off before next poll"
            );
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        info!("Orchestrator shutdown complete");
        Ok(())
    }

    /// Poll once and process the batch. Used outside of `run` to drive the
    /// cycle step by step.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, PipelineError> {
        let batch = self.consumer.poll_batch(self.config.poll_timeout).await?;
        self.process_batch(batch).await
    }

    /// Index a polled batch, then commit it or rewind the failed partitions.
    ///
    /// Returns an error only for failures that leave the consumer position
    /// unsafe to continue from: a failed commit or a failed rewind.
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    pub async fn process_batch(&mut self, batch: Vec<LogMessage>) -> Result<CycleReport, PipelineError> {
        info!(count = batch.len(), "Received records");

        let mut report = CycleReport {
            polled: batch.len(),
            ..CycleReport::default()
        };
        if batch.is_empty() {
            return Ok(report);
        }

        let records = self.processor.process_batch(&batch);
        let load = self.loader.load(&records).await;

        report.indexed = load.indexed;
        report.skipped = load.skipped;
        report.failed = load.failures.len();

        if !load.is_complete() {
            // Earliest failed offset per partition; everything from there on
            // is redelivered by the next poll.
            let mut earliest: BTreeMap<(String, i32), CursorPosition> = BTreeMap::new();
            for failure in &load.failures {
                let cursor = failure.position.redelivery_cursor();
                earliest
                    .entry((cursor.topic.clone(), cursor.partition))
                    .and_modify(|current| {
                        if cursor.offset < current.offset {
                            *current = cursor.clone();
                        }
                    })
                    .or_insert(cursor);
            }
            let rewind: Vec<CursorPosition> = earliest.into_values().collect();

            warn!(
                failed = report.failed,
                indexed = report.indexed,
                "Batch not fully indexed, skipping commit"
            );
            self.consumer.rewind(&rewind).await?;
            report.rewound = rewind;
            return Ok(report);
        }

        let positions = commit_positions(&batch);
        if let Err(e) = self.consumer.commit(&positions).await {
            error!(error = %e, positions = ?positions, "Offset commit failed");
            return Err(e);
        }
        report.committed = true;

        info!(
            indexed = report.indexed,
            skipped = report.skipped,
            "Offsets are committed"
        );
        debug!(positions = ?positions, "Committed positions");
        Ok(report)
    }

    fn failure_backoff(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(16);
        self.config
            .initial_failure_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.config.max_failure_backoff)
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
