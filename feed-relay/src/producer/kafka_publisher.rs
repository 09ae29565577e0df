use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::EventPublisher;
use crate::config::ProducerSettings;
use crate::RelayError;

/// Pause between enqueue attempts while the send queue is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

/// Longest a single publish waits for room in the send queue.
const MAX_ENQUEUE_WAIT: Duration = Duration::from_secs(60);

/// [`EventPublisher`] backed by an rdkafka `FutureProducer`.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(brokers: &str, settings: &ProducerSettings) -> Result<Self, RelayError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", "feed-relay")
            .set("linger.ms", settings.linger_ms.to_string())
            .set("batch.size", settings.batch_size.to_string())
            .set("compression.type", &settings.compression)
            .set("message.timeout.ms", settings.message_timeout_ms.to_string())
            .create()?;

        info!(
            brokers,
            linger_ms = settings.linger_ms,
            batch_size = settings.batch_size,
            compression = %settings.compression,
            "Producer created"
        );

        Ok(Self { producer })
    }
}

/// Call `send` until it accepts `record`, pausing while it reports a full
/// queue. Gives up with the last error once `max_wait` has passed.
async fn enqueue_while_full<R, T, F>(
    mut record: R,
    max_wait: Duration,
    mut send: F,
) -> Result<T, KafkaError>
where
    F: FnMut(R) -> Result<T, (KafkaError, R)>,
{
    let deadline = Instant::now() + max_wait;

    loop {
        match send(record) {
            Ok(accepted) => return Ok(accepted),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), returned))
                if Instant::now() < deadline =>
            {
                debug!("Producer queue full, waiting for room");
                record = returned;
                tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
            }
            Err((e, _)) => return Err(e),
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), RelayError> {
        let record = FutureRecord::<(), str>::to(topic).payload(payload);

        let delivery = enqueue_while_full(record, MAX_ENQUEUE_WAIT, |record| {
            self.producer.send_result(record)
        })
        .await
        .map_err(|e| RelayError::kafka(format!("failed to enqueue record: {}", e)))?;

        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => debug!(partition, offset, "Record delivered"),
                Ok(Err((e, _))) => warn!(error = %e, "Record delivery failed"),
                Err(_) => warn!("Delivery report dropped before completion"),
            }
        });

        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<(), RelayError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| RelayError::kafka(format!("flush task failed: {}", e)))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_full() -> KafkaError {
        KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_is_retried_until_accepted() {
        let mut attempts = 0;

        let accepted = enqueue_while_full("record", Duration::from_secs(5), |record| {
            attempts += 1;
            if attempts < 3 {
                Err((queue_full(), record))
            } else {
                Ok(record.len())
            }
        })
        .await;

        assert_eq!(accepted.unwrap(), 6);
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_gives_up_after_max_wait() {
        let started = Instant::now();

        let result: Result<(), _> =
            enqueue_while_full((), Duration::from_secs(1), |record| Err((queue_full(), record)))
                .await;

        assert!(matches!(
            result,
            Err(KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull))
        ));
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mut attempts = 0;

        let result: Result<(), _> = enqueue_while_full((), Duration::from_secs(5), |record| {
            attempts += 1;
            Err((
                KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge),
                record,
            ))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
