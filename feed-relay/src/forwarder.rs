//! Forwards feed events to the durable log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_indexer_shared::FeedEvent;
use tracing::{error, info, warn};

use crate::feed::FeedHandler;
use crate::producer::EventPublisher;
use crate::RelayError;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// [`FeedHandler`] that publishes each event payload, unchanged and without
/// a key, to one topic.
pub struct LogForwarder {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl LogForwarder {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Events handed to the publisher.
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Events that were empty or could not be enqueued.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FeedHandler for LogForwarder {
    fn on_open(&self) {
        info!(topic = %self.topic, "Feed connected");
    }

    async fn on_message(&self, event: FeedEvent) {
        if event.data.trim().is_empty() {
            warn!(event_id = ?event.id, "Dropping event with empty payload");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.publisher.publish(&self.topic, &event.data).await {
            Ok(()) => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(error = %e, event_id = ?event.id, "Failed to forward event");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn on_error(&self, error: &RelayError) {
        warn!(error = %error, "Feed connection error");
    }

    async fn on_closed(&self) {
        info!(
            forwarded = self.forwarded_count(),
            dropped = self.dropped_count(),
            "Feed closed, flushing producer"
        );
        if let Err(e) = self.publisher.flush(FLUSH_TIMEOUT).await {
            error!(error = %e, "Producer flush did not complete");
        }
    }
}
