// Domain models for feature ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One message as handed over by the broker, detached from the consumer's buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// `None` for tombstones
    pub payload: Option<Vec<u8>>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Option<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            payload,
        }
    }

    /// Payload as text for log lines; invalid UTF-8 is replaced, not rejected.
    pub fn payload_lossy(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}

/// Event-time marker, kept exactly as the producer sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTimestamp {
    Text(String),
    Numeric(serde_json::Number),
}

impl fmt::Display for EventTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTimestamp::Text(s) => f.write_str(s),
            EventTimestamp::Numeric(n) => write!(f, "{}", n),
        }
    }
}

/// A validated feature signal decoded from a single message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEvent {
    pub user_id: String,
    pub event_type: String,
    pub feature_value: f64,
    pub timestamp: EventTimestamp,
}

impl FeatureEvent {
    /// Uniqueness key used by the store: (user_id, event_type, timestamp)
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.user_id.clone(),
            self.event_type.clone(),
            self.timestamp.to_string(),
        )
    }
}

/// Stored projection of a `FeatureEvent` (`user_features` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeatureRecord {
    pub feature_id: Uuid,
    pub user_id: String,
    pub event_type: String,
    pub feature_value: f64,
    pub ingestion_timestamp: Option<DateTime<Utc>>,
}

/// Result of proposing a record to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New row written
    Inserted,
    /// Same (user_id, event_type, timestamp) already stored; nothing written
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_timestamp_displays_verbatim() {
        let ts: EventTimestamp = serde_json::from_str("1704067200").unwrap();
        assert_eq!(ts, EventTimestamp::Numeric(1704067200.into()));
        assert_eq!(ts.to_string(), "1704067200");

        let ts: EventTimestamp = serde_json::from_str("1704067200.5").unwrap();
        assert_eq!(ts.to_string(), "1704067200.5");
    }

    #[test]
    fn test_dedup_key_ignores_value() {
        let a = FeatureEvent {
            user_id: "u1".into(),
            event_type: "click".into(),
            feature_value: 1.0,
            timestamp: EventTimestamp::Text("T1".into()),
        };
        let b = FeatureEvent {
            feature_value: 2.0,
            ..a.clone()
        };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_payload_lossy_handles_tombstone() {
        let msg = RawMessage::new("raw_data_events", 0, 7, None);
        assert_eq!(msg.payload_lossy(), "");
    }
}
