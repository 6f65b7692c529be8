//! Shared helpers for feature-ingestor integration tests

use async_trait::async_trait;
use feature_ingestor::{FeatureEvent, IngestError, InsertOutcome, Result, StorageGateway};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// In-memory store that enforces the (user_id, event_type, timestamp) key
#[derive(Default)]
pub struct MemoryGateway {
    rows: Mutex<HashMap<(String, String, String), FeatureEvent>>,
    attempts: AtomicU32,
    /// Fail this many inserts before accepting writes again
    fail_next: AtomicU32,
}

impl MemoryGateway {
    pub fn failing(times: u32) -> Self {
        let gateway = Self::default();
        gateway.fail_next.store(times, Ordering::SeqCst);
        gateway
    }

    pub fn rows(&self) -> Vec<FeatureEvent> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_record(&self, event: &FeatureEvent) -> Result<InsertOutcome> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(IngestError::StorageWrite("connection reset by peer".into()));
        }

        let mut rows = self.rows.lock().unwrap();
        let key = event.dedup_key();
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        rows.insert(key, event.clone());
        Ok(InsertOutcome::Inserted)
    }
}

pub fn payload(user_id: &str, event_type: &str, value: &str, timestamp: &str) -> String {
    format!(
        r#"{{"user_id":"{}","event_type":"{}","value":{},"timestamp":"{}"}}"#,
        user_id, event_type, value, timestamp
    )
}
