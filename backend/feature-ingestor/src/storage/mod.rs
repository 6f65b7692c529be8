// Storage gateway for feature records
//
// The ingestion loop only sees `StorageGateway`; whether connections are opened
// per call or drawn from a pool is decided when the gateway is built.

mod postgres;

pub use postgres::{PerCallGateway, PooledGateway, CREATE_USER_FEATURES_TABLE};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FeatureEvent, InsertOutcome};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Create the destination table if it does not exist.
    ///
    /// Safe to run concurrently from several instances.
    async fn ensure_schema(&self) -> Result<()>;

    /// Propose one record. A record with the same (user_id, event_type,
    /// timestamp) already stored yields `InsertOutcome::Duplicate`, not an error.
    async fn insert_record(&self, event: &FeatureEvent) -> Result<InsertOutcome>;
}
