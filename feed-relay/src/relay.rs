//! Background relay task and its handle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::feed::{EventSource, ReconnectPolicy};
use crate::forwarder::LogForwarder;
use crate::producer::EventPublisher;
use crate::RelayError;

/// Wires a feed subscription to a publisher.
pub struct Relay {
    publisher: Arc<dyn EventPublisher>,
    policy: ReconnectPolicy,
}

impl Relay {
    pub fn new(publisher: Arc<dyn EventPublisher>, policy: ReconnectPolicy) -> Self {
        Self { publisher, policy }
    }

    /// Connect to `feed_url` in a background task and forward every event to
    /// `topic`. Returns as soon as the task is spawned.
    pub fn start(&self, feed_url: &str, topic: &str) -> Result<RelayHandle, RelayError> {
        let source = EventSource::new(feed_url, self.policy)?;
        let forwarder = Arc::new(LogForwarder::new(self.publisher.clone(), topic));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        info!(feed_url, topic, "Starting relay");
        let task_forwarder = forwarder.clone();
        let task = tokio::spawn(async move {
            source.run(task_forwarder.as_ref(), shutdown_rx).await;
        });

        Ok(RelayHandle {
            shutdown_tx,
            task,
            forwarder,
        })
    }
}

/// Handle to a running relay.
pub struct RelayHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
    forwarder: Arc<LogForwarder>,
}

impl RelayHandle {
    /// Stop the feed, then wait for the producer flush to finish.
    pub async fn shutdown(self) -> Result<(), RelayError> {
        let _ = self.shutdown_tx.send(());
        self.task.await.map_err(|_| RelayError::Cancelled)?;

        info!(
            forwarded = self.forwarder.forwarded_count(),
            dropped = self.forwarder.dropped_count(),
            "Relay stopped"
        );
        Ok(())
    }
}
