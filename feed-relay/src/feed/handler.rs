use async_trait::async_trait;
use feed_indexer_shared::FeedEvent;

use crate::RelayError;

/// Callbacks invoked by [`super::EventSource`] as the feed connection
/// progresses.
///
/// `on_message` runs on the task that reads the feed, so the next chunk is
/// not read until it returns.
#[async_trait]
pub trait FeedHandler: Send + Sync {
    /// A connection was established (also after every reconnect).
    fn on_open(&self);

    async fn on_message(&self, event: FeedEvent);

    /// The connection failed or dropped. A reconnect follows.
    fn on_error(&self, error: &RelayError);

    /// The source stopped for good.
    async fn on_closed(&self);
}
