use async_trait::async_trait;
use resilience::RetryPolicy;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, PgExecutor};
use tracing::{debug, info, warn};

use super::StorageGateway;
use crate::error::{IngestError, Result};
use crate::models::{EventTimestamp, FeatureEvent, FeatureRecord, InsertOutcome};

pub const CREATE_USER_FEATURES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS user_features (
        feature_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id VARCHAR(255) NOT NULL,
        event_type VARCHAR(255) NOT NULL,
        feature_value DOUBLE PRECISION NOT NULL,
        ingestion_timestamp TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, event_type, ingestion_timestamp)
    )
"#;

const INSERT_WITH_TEXT_TIMESTAMP: &str = r#"
    INSERT INTO user_features (user_id, event_type, feature_value, ingestion_timestamp)
    VALUES ($1, $2, $3, $4::text::timestamptz)
    ON CONFLICT (user_id, event_type, ingestion_timestamp) DO NOTHING
"#;

// Numeric timestamps are Unix epoch seconds.
const INSERT_WITH_EPOCH_TIMESTAMP: &str = r#"
    INSERT INTO user_features (user_id, event_type, feature_value, ingestion_timestamp)
    VALUES ($1, $2, $3, to_timestamp($4::double precision))
    ON CONFLICT (user_id, event_type, ingestion_timestamp) DO NOTHING
"#;

const SELECT_BY_USER: &str = r#"
    SELECT feature_id, user_id, event_type, feature_value, ingestion_timestamp
    FROM user_features
    WHERE user_id = $1
    ORDER BY ingestion_timestamp
"#;

async fn create_table<'e, E: PgExecutor<'e>>(executor: E) -> Result<()> {
    sqlx::query(CREATE_USER_FEATURES_TABLE)
        .execute(executor)
        .await
        .map_err(|e| IngestError::StorageWrite(format!("failed to create user_features: {}", e)))?;
    Ok(())
}

async fn insert_feature<'e, E: PgExecutor<'e>>(
    executor: E,
    event: &FeatureEvent,
) -> Result<InsertOutcome> {
    let result = match &event.timestamp {
        EventTimestamp::Text(ts) => {
            sqlx::query(INSERT_WITH_TEXT_TIMESTAMP)
                .bind(&event.user_id)
                .bind(&event.event_type)
                .bind(event.feature_value)
                .bind(ts)
                .execute(executor)
                .await
        }
        EventTimestamp::Numeric(n) => {
            let epoch_secs = n.as_f64().ok_or_else(|| {
                IngestError::StorageWrite(format!("timestamp {} is not representable", n))
            })?;
            sqlx::query(INSERT_WITH_EPOCH_TIMESTAMP)
                .bind(&event.user_id)
                .bind(&event.event_type)
                .bind(event.feature_value)
                .bind(epoch_secs)
                .execute(executor)
                .await
        }
    }
    .map_err(|e| IngestError::StorageWrite(e.to_string()))?;

    if result.rows_affected() > 0 {
        Ok(InsertOutcome::Inserted)
    } else {
        debug!(
            user_id = %event.user_id,
            event_type = %event.event_type,
            timestamp = %event.timestamp,
            "Feature already stored (duplicate)"
        );
        Ok(InsertOutcome::Duplicate)
    }
}

async fn select_by_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &str,
) -> Result<Vec<FeatureRecord>> {
    sqlx::query_as::<_, FeatureRecord>(SELECT_BY_USER)
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(|e| IngestError::StorageWrite(e.to_string()))
}

/// Opens a dedicated connection for every operation and closes it afterwards.
///
/// Connection acquisition goes through `RetryPolicy`; with the default
/// unbounded policy a store outage blocks the caller until the store is back.
/// On the per-message path that means one connect per message; use
/// `PooledGateway` where that cost matters.
pub struct PerCallGateway {
    options: PgConnectOptions,
    retry: RetryPolicy,
}

impl PerCallGateway {
    pub fn new(options: PgConnectOptions, retry: RetryPolicy) -> Self {
        Self { options, retry }
    }

    async fn connect(&self) -> Result<PgConnection> {
        let options = &self.options;
        let conn = self
            .retry
            .retry(move || PgConnection::connect_with(options))
            .await
            .map_err(|e| {
                let attempts = e.attempts();
                IngestError::StorageConnection(format!(
                    "PostgreSQL unavailable after {} attempts: {}",
                    attempts,
                    e.into_last_error()
                ))
            })?;

        debug!("Connected to PostgreSQL");
        Ok(conn)
    }

    /// Stored records for one user, oldest first.
    pub async fn records_for_user(&self, user_id: &str) -> Result<Vec<FeatureRecord>> {
        let mut conn = self.connect().await?;
        let result = select_by_user(&mut conn, user_id).await;
        close(conn).await;
        result
    }
}

#[async_trait]
impl StorageGateway for PerCallGateway {
    async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        let result = create_table(&mut conn).await;
        close(conn).await;
        result?;

        info!("user_features table is ready");
        Ok(())
    }

    async fn insert_record(&self, event: &FeatureEvent) -> Result<InsertOutcome> {
        let mut conn = self.connect().await?;
        let result = insert_feature(&mut conn, event).await;
        close(conn).await;
        result
    }
}

async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close PostgreSQL connection cleanly: {}", e);
    }
}

/// Same contract as `PerCallGateway` over a shared `PgPool`.
pub struct PooledGateway {
    pool: PgPool,
}

impl PooledGateway {
    /// Build the pool, retrying the initial connect with `retry`.
    pub async fn connect(
        options: PgConnectOptions,
        max_connections: u32,
        retry: &RetryPolicy,
    ) -> Result<Self> {
        let pool = retry
            .retry(|| {
                PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect_with(options.clone())
            })
            .await
            .map_err(|e| {
                let attempts = e.attempts();
                IngestError::StorageConnection(format!(
                    "PostgreSQL pool unavailable after {} attempts: {}",
                    attempts,
                    e.into_last_error()
                ))
            })?;

        info!(max_connections, "PostgreSQL connection pool created");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn records_for_user(&self, user_id: &str) -> Result<Vec<FeatureRecord>> {
        select_by_user(&self.pool, user_id).await
    }
}

#[async_trait]
impl StorageGateway for PooledGateway {
    async fn ensure_schema(&self) -> Result<()> {
        create_table(&self.pool).await?;
        info!("user_features table is ready");
        Ok(())
    }

    async fn insert_record(&self, event: &FeatureEvent) -> Result<InsertOutcome> {
        insert_feature(&self.pool, event).await
    }
}
