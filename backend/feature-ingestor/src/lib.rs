//! Feature ingestion pipeline
//!
//! ```text
//! Kafka → consumer (MessageSource) → ingest (IngestionLoop) → decoder → storage (StorageGateway) → PostgreSQL
//! ```
//!
//! Delivery is at-least-once from the broker. Duplicate deliveries are
//! absorbed by the `(user_id, event_type, ingestion_timestamp)` unique key in
//! `user_features`. Offsets are auto-committed independently of write success,
//! so a write that fails after its offset was committed is lost.

pub mod config;
pub mod consumer;
pub mod decoder;
pub mod error;
pub mod ingest;
pub mod models;
pub mod storage;

// Re-export common types
pub use config::{Config, StorageMode};
pub use consumer::{KafkaSource, MessageSource, ReplaySource};
pub use error::{IngestError, Result};
pub use ingest::{IngestStats, IngestionLoop, MessageOutcome};
pub use models::{EventTimestamp, FeatureEvent, FeatureRecord, InsertOutcome, RawMessage};
pub use storage::{PerCallGateway, PooledGateway, StorageGateway};
