//! Consumer lifecycle: broker connection, group membership and offset policy.
//!
//! Offsets are auto-committed by librdkafka on a timer, independently of
//! whether the storage write for a message succeeded. A message whose offset
//! was committed before its write failed is not redelivered.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::collections::VecDeque;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::models::RawMessage;

/// Lazy sequence of raw messages in delivery order.
#[async_trait]
pub trait MessageSource: Send {
    /// Next message, `Some(Err(_))` for a broker-side error, `None` once the
    /// stream is closed.
    async fn next_message(&mut self) -> Option<Result<RawMessage>>;
}

/// librdkafka settings for the ingestion consumer group
pub fn client_config(config: &Config) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("group.id", &config.kafka_group_id)
        .set("bootstrap.servers", &config.kafka_bootstrap_servers)
        .set("enable.auto.commit", "true")
        .set(
            "auto.commit.interval.ms",
            config.kafka_auto_commit_interval_ms.to_string(),
        )
        .set("auto.offset.reset", "earliest")
        .set(
            "session.timeout.ms",
            config.kafka_session_timeout_ms.to_string(),
        )
        .set("enable.partition.eof", "false");
    client
}

pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    /// Create the consumer, subscribe, and confirm the broker answers.
    ///
    /// Any failure here is `IngestError::BrokerConnection`; there is no retry.
    pub fn connect(config: &Config) -> Result<Self> {
        let consumer: StreamConsumer = client_config(config).create().map_err(|e| {
            error!("Failed to create Kafka consumer: {}", e);
            IngestError::BrokerConnection(e.to_string())
        })?;

        consumer.subscribe(&[config.kafka_topic.as_str()]).map_err(|e| {
            error!("Failed to subscribe to topic {}: {}", config.kafka_topic, e);
            IngestError::BrokerConnection(e.to_string())
        })?;

        let metadata = consumer
            .fetch_metadata(Some(config.kafka_topic.as_str()), config.startup_timeout())
            .map_err(|e| {
                error!(
                    "Kafka brokers {} unreachable: {}",
                    config.kafka_bootstrap_servers, e
                );
                IngestError::BrokerConnection(e.to_string())
            })?;

        match metadata
            .topics()
            .iter()
            .find(|t| t.name() == config.kafka_topic)
        {
            Some(topic) if topic.error().is_none() => info!(
                topic = %config.kafka_topic,
                partitions = topic.partitions().len(),
                group_id = %config.kafka_group_id,
                "Kafka consumer started"
            ),
            _ => warn!(
                topic = %config.kafka_topic,
                "Topic metadata unavailable; waiting for partition assignment"
            ),
        }

        Ok(Self {
            consumer,
            topic: config.kafka_topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn next_message(&mut self) -> Option<Result<RawMessage>> {
        let next = match self.consumer.recv().await {
            Ok(msg) => Ok(RawMessage::new(
                msg.topic(),
                msg.partition(),
                msg.offset(),
                msg.payload().map(|p| p.to_vec()),
            )),
            Err(e) => Err(IngestError::BrokerReceive(e.to_string())),
        };
        Some(next)
    }
}

/// Finite in-memory source, drained in order.
#[derive(Debug, Default)]
pub struct ReplaySource {
    items: VecDeque<Result<RawMessage>>,
}

impl ReplaySource {
    pub fn new(items: impl IntoIterator<Item = Result<RawMessage>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Wrap payloads as consecutive offsets on partition 0 of `topic`.
    pub fn from_payloads<I, P>(topic: &str, payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        Self::new(
            payloads
                .into_iter()
                .enumerate()
                .map(|(offset, p)| Ok(RawMessage::new(topic, 0, offset as i64, Some(p.into())))),
        )
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl MessageSource for ReplaySource {
    async fn next_message(&mut self) -> Option<Result<RawMessage>> {
        self.items.pop_front()
    }
}
