//! Sequential decode -> validate -> store loop.
//!
//! One message at a time, in delivery order. Nothing a single message does
//! stops the loop: decode, validation and storage failures are logged and the
//! next message is pulled. Failed writes are not retried here; connection
//! retries happen inside the storage gateway.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::consumer::MessageSource;
use crate::decoder;
use crate::error::{IngestError, Result};
use crate::models::{InsertOutcome, RawMessage};
use crate::storage::StorageGateway;

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Stored,
    Duplicate,
    DecodeFailed,
    Rejected,
    StorageFailed,
}

/// Running per-outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub stored: u64,
    pub duplicates: u64,
    pub decode_failures: u64,
    pub rejected: u64,
    pub storage_failures: u64,
    pub receive_errors: u64,
}

impl IngestStats {
    pub fn record(&mut self, outcome: MessageOutcome) {
        self.received += 1;
        match outcome {
            MessageOutcome::Stored => self.stored += 1,
            MessageOutcome::Duplicate => self.duplicates += 1,
            MessageOutcome::DecodeFailed => self.decode_failures += 1,
            MessageOutcome::Rejected => self.rejected += 1,
            MessageOutcome::StorageFailed => self.storage_failures += 1,
        }
    }

    fn log_summary(&self, message: &'static str) {
        info!(
            received = self.received,
            stored = self.stored,
            duplicates = self.duplicates,
            decode_failures = self.decode_failures,
            rejected = self.rejected,
            storage_failures = self.storage_failures,
            receive_errors = self.receive_errors,
            "{}",
            message
        );
    }
}

pub struct IngestionLoop<S> {
    source: S,
    gateway: Arc<dyn StorageGateway>,
    stats: IngestStats,
    stats_log_interval: u64,
    recv_error_backoff: Duration,
}

impl<S: MessageSource> IngestionLoop<S> {
    pub fn new(source: S, gateway: Arc<dyn StorageGateway>) -> Self {
        Self {
            source,
            gateway,
            stats: IngestStats::default(),
            stats_log_interval: 1000,
            recv_error_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_stats_log_interval(mut self, every: u64) -> Self {
        self.stats_log_interval = every.max(1);
        self
    }

    pub fn with_recv_error_backoff(mut self, backoff: Duration) -> Self {
        self.recv_error_backoff = backoff;
        self
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Consume until the source is exhausted.
    ///
    /// Only a source error that is not a per-message error (e.g. the broker
    /// connection itself is gone) ends the loop early with `Err`.
    pub async fn run(mut self) -> Result<IngestStats> {
        info!("Starting ingestion loop");

        while let Some(next) = self.source.next_message().await {
            match next {
                Ok(msg) => {
                    let outcome = self.process(&msg).await;
                    self.stats.record(outcome);

                    if self.stats.received % self.stats_log_interval == 0 {
                        self.stats.log_summary("Ingestion progress");
                    }
                }
                Err(e) if e.is_per_message() => {
                    self.stats.receive_errors += 1;
                    error!("Kafka consumer error: {}", e);
                    // Avoid a tight error loop while the broker recovers
                    tokio::time::sleep(self.recv_error_backoff).await;
                }
                Err(e) => {
                    error!("Message source failed: {}", e);
                    self.stats.log_summary("Ingestion stopped");
                    return Err(e);
                }
            }
        }

        self.stats.log_summary("Message stream exhausted");
        Ok(self.stats)
    }

    /// Decode, validate and store one message. Never fails; the outcome says
    /// what happened.
    pub async fn process(&self, msg: &RawMessage) -> MessageOutcome {
        debug!(
            topic = %msg.topic,
            partition = msg.partition,
            offset = msg.offset,
            "Received message"
        );

        let event = match decoder::decode(msg.payload.as_deref()) {
            Ok(event) => event,
            Err(e @ IngestError::Decode(_)) => {
                error!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    "JSON decoding error: {} - Message: {}",
                    e,
                    msg.payload_lossy()
                );
                return MessageOutcome::DecodeFailed;
            }
            Err(e) => {
                warn!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    "Invalid message format: {}",
                    e
                );
                return MessageOutcome::Rejected;
            }
        };

        match self.gateway.insert_record(&event).await {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    user_id = %event.user_id,
                    event_type = %event.event_type,
                    offset = msg.offset,
                    "Feature for {} stored successfully",
                    event.user_id
                );
                MessageOutcome::Stored
            }
            Ok(InsertOutcome::Duplicate) => {
                debug!(
                    user_id = %event.user_id,
                    offset = msg.offset,
                    "Duplicate feature ignored"
                );
                MessageOutcome::Duplicate
            }
            Err(e) => {
                error!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    user_id = %event.user_id,
                    "Error processing message: {}",
                    e
                );
                MessageOutcome::StorageFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ReplaySource;
    use crate::models::{EventTimestamp, FeatureEvent};
    use crate::storage::MockStorageGateway;
    use mockall::predicate::*;
    use mockall::Sequence;

    fn source(payloads: &[&str]) -> ReplaySource {
        ReplaySource::from_payloads("raw_data_events", payloads.iter().map(|p| p.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_zero_value_stored_verbatim() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_insert_record()
            .with(eq(FeatureEvent {
                user_id: "u1".into(),
                event_type: "click".into(),
                feature_value: 0.0,
                timestamp: EventTimestamp::Text("2024-01-01T00:00:00Z".into()),
            }))
            .times(1)
            .returning(|_| Ok(InsertOutcome::Inserted));

        let stats = IngestionLoop::new(
            source(&[r#"{"user_id":"u1","event_type":"click","value":0,"timestamp":"2024-01-01T00:00:00Z"}"#]),
            Arc::new(gateway),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(stats.stored, 1);
    }

    #[tokio::test]
    async fn test_invalid_messages_make_no_storage_calls() {
        let mut gateway = MockStorageGateway::new();
        gateway.expect_insert_record().never();

        let stats = IngestionLoop::new(
            source(&[
                r#"{"user_id":"u1","event_type":"click","timestamp":"T1"}"#,
                r#"{"user_id":"u1","event_type":"click","value":null,"timestamp":"T1"}"#,
                r#"{"user_id":"","event_type":"click","value":1,"timestamp":"T1"}"#,
                "not json at all",
            ]),
            Arc::new(gateway),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(stats.received, 4);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.decode_failures, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_stop_loop() {
        let mut seq = Sequence::new();
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_insert_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(IngestError::StorageWrite("disk full".into())));
        gateway
            .expect_insert_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InsertOutcome::Inserted));

        let stats = IngestionLoop::new(
            source(&[
                r#"{"user_id":"u1","event_type":"click","value":1,"timestamp":"T1"}"#,
                r#"{"user_id":"u2","event_type":"click","value":2,"timestamp":"T2"}"#,
            ]),
            Arc::new(gateway),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(stats.storage_failures, 1);
        assert_eq!(stats.stored, 1);
    }

    #[tokio::test]
    async fn test_messages_stored_in_delivery_order() {
        let mut seq = Sequence::new();
        let mut gateway = MockStorageGateway::new();
        for user in ["a", "b", "c"] {
            gateway
                .expect_insert_record()
                .withf(move |event| event.user_id == user)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(InsertOutcome::Inserted));
        }

        IngestionLoop::new(
            source(&[
                r#"{"user_id":"a","event_type":"view","value":1,"timestamp":"T1"}"#,
                r#"{"user_id":"b","event_type":"view","value":1,"timestamp":"T1"}"#,
                r#"{"user_id":"c","event_type":"view","value":1,"timestamp":"T1"}"#,
            ]),
            Arc::new(gateway),
        )
        .run()
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_receive_error_skipped_and_fatal_error_stops() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_insert_record()
            .times(1)
            .returning(|_| Ok(InsertOutcome::Duplicate));

        let replay = ReplaySource::new(vec![
            Err(IngestError::BrokerReceive("partition leader moved".into())),
            Ok(RawMessage::new(
                "raw_data_events",
                0,
                1,
                Some(br#"{"user_id":"u1","event_type":"click","value":3.5,"timestamp":"T1"}"#.to_vec()),
            )),
            Err(IngestError::BrokerConnection("all brokers down".into())),
        ]);

        let result = IngestionLoop::new(replay, Arc::new(gateway))
            .with_recv_error_backoff(Duration::from_millis(1))
            .run()
            .await;

        assert!(matches!(result, Err(IngestError::BrokerConnection(_))));
    }

    #[tokio::test]
    async fn test_process_reports_outcome() {
        let mut gateway = MockStorageGateway::new();
        gateway
            .expect_insert_record()
            .returning(|_| Ok(InsertOutcome::Duplicate));

        let ingest = IngestionLoop::new(ReplaySource::default(), Arc::new(gateway));
        let msg = RawMessage::new(
            "raw_data_events",
            3,
            42,
            Some(br#"{"user_id":"u1","event_type":"click","value":3.5,"timestamp":"T1"}"#.to_vec()),
        );

        assert_eq!(ingest.process(&msg).await, MessageOutcome::Duplicate);
        assert_eq!(
            ingest.process(&RawMessage::new("raw_data_events", 3, 43, None)).await,
            MessageOutcome::DecodeFailed
        );
        assert_eq!(ingest.stats(), &IngestStats::default());
    }
}
