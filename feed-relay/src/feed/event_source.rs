//! Long-lived SSE connection with automatic reconnects.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::{FeedHandler, SseDecoder};
use crate::RelayError;

const USER_AGENT: &str = concat!("feed-relay/", env!("CARGO_PKG_VERSION"));

/// Bounded exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// The delay that follows `current`, capped at `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

/// State carried from one connection attempt to the next.
#[derive(Debug)]
struct ResumeState {
    last_event_id: Option<String>,
    server_retry: Option<Duration>,
    delay: Duration,
}

/// An SSE subscription to a single URL.
pub struct EventSource {
    client: reqwest::Client,
    url: String,
    policy: ReconnectPolicy,
}

impl EventSource {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            policy,
        })
    }

    /// Stream events into `handler` until `shutdown` fires.
    ///
    /// Connection failures are reported through `on_error` and retried; this
    /// only returns once the shutdown signal is received, after `on_closed`
    /// has completed.
    #[instrument(skip(self, handler, shutdown), fields(url = %self.url))]
    pub async fn run(&self, handler: &dyn FeedHandler, mut shutdown: broadcast::Receiver<()>) {
        let mut state = ResumeState {
            last_event_id: None,
            server_retry: None,
            delay: self.policy.initial_delay,
        };

        loop {
            let outcome = tokio::select! {
                _ = shutdown.recv() => break,
                outcome = self.stream_once(handler, &mut state) => outcome,
            };

            match outcome {
                Ok(()) => info!("Feed stream ended by server"),
                Err(e) => handler.on_error(&e),
            }

            let wait = state.server_retry.unwrap_or(state.delay);
            debug!(wait_ms = wait.as_millis() as u64, "Reconnecting to feed");
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            state.delay = self.policy.next_delay(state.delay);
        }

        info!("Feed source stopped");
        handler.on_closed().await;
    }

    async fn stream_once(
        &self,
        handler: &dyn FeedHandler,
        state: &mut ResumeState,
    ) -> Result<(), RelayError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = &state.last_event_id {
            request = request.header("Last-Event-ID", id.as_str());
        }

        let response = request.send().await?.error_for_status()?;
        handler.on_open();
        state.delay = self.policy.initial_delay;

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                handler.on_message(event).await;
            }
            if let Some(id) = decoder.last_event_id() {
                if state.last_event_id.as_deref() != Some(id) {
                    state.last_event_id = Some(id.to_string());
                }
            }
            if let Some(retry) = decoder.take_retry() {
                state.server_retry = Some(retry);
            }
        }

        if state.last_event_id.is_none() {
            warn!("Feed sent no event ids; events during the reconnect gap are lost");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use feed_indexer_shared::FeedEvent;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        let first = policy.next_delay(policy.initial_delay);
        let second = policy.next_delay(first);
        let third = policy.next_delay(second);

        assert_eq!(first, Duration::from_millis(200));
        assert_eq!(second, Duration::from_millis(350));
        assert_eq!(third, Duration::from_millis(350));
    }

    #[derive(Default)]
    struct RecordingHandler {
        opens: AtomicUsize,
        messages: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl FeedHandler for RecordingHandler {
        fn on_open(&self) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_message(&self, event: FeedEvent) {
            self.messages.lock().unwrap().push(event.data);
        }

        fn on_error(&self, _error: &RelayError) {}

        async fn on_closed(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    const STREAM_HEADERS: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            request.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&request).to_lowercase()
    }

    #[tokio::test]
    async fn test_reconnect_resumes_from_last_completed_event() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/stream", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut first, _) = listener.accept().await.unwrap();
            let first_request = read_request(&mut first).await;
            first.write_all(STREAM_HEADERS).await.unwrap();
            first
                .write_all(b"retry: 10\nid: 1\ndata: a\n\nid: 2\ndata: b\n")
                .await
                .unwrap();
            drop(first);

            let (mut second, _) = listener.accept().await.unwrap();
            let second_request = read_request(&mut second).await;
            second.write_all(STREAM_HEADERS).await.unwrap();
            (first_request, second_request, second)
        });

        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
        };
        let source = EventSource::new(url, policy).unwrap();
        let handler = Arc::new(RecordingHandler::default());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let run = tokio::spawn({
            let handler = handler.clone();
            async move { source.run(handler.as_ref(), shutdown_rx).await }
        });

        let (first_request, second_request, _open_socket) =
            tokio::time::timeout(Duration::from_secs(5), server)
                .await
                .expect("relay did not reconnect within the server retry hint")
                .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while handler.opens.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(()).unwrap();
        run.await.unwrap();

        assert!(!first_request.contains("last-event-id"));
        assert!(second_request.contains("last-event-id: 1\r\n"));
        assert_eq!(*handler.messages.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(handler.opens.load(Ordering::SeqCst), 2);
        assert!(handler.closed.load(Ordering::SeqCst));
    }
}
