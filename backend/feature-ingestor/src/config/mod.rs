use anyhow::{anyhow, Result};
use resilience::{presets, Backoff, RetryPolicy};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::time::Duration;

/// How the storage gateway obtains connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Fresh connection per operation, closed afterwards
    PerCall,
    /// Shared `PgPool`
    Pooled,
}

#[derive(Clone, Deserialize)]
pub struct Config {
    // Kafka
    pub kafka_bootstrap_servers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub kafka_auto_commit_interval_ms: u64,
    pub kafka_session_timeout_ms: u64,
    pub kafka_startup_timeout_ms: u64,
    pub kafka_recv_error_backoff_ms: u64,

    // PostgreSQL
    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_db: String,
    pub postgres_user: String,
    pub postgres_password: String,

    // Storage gateway
    pub storage_mode: StorageMode,
    pub storage_pool_max_connections: u32,
    pub storage_connect_retry_delay_ms: u64,
    pub storage_connect_max_attempts: Option<u32>,

    // Observability
    pub stats_log_interval: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("kafka_bootstrap_servers", &self.kafka_bootstrap_servers)
            .field("kafka_topic", &self.kafka_topic)
            .field("kafka_group_id", &self.kafka_group_id)
            .field("kafka_auto_commit_interval_ms", &self.kafka_auto_commit_interval_ms)
            .field("kafka_session_timeout_ms", &self.kafka_session_timeout_ms)
            .field("kafka_startup_timeout_ms", &self.kafka_startup_timeout_ms)
            .field("kafka_recv_error_backoff_ms", &self.kafka_recv_error_backoff_ms)
            .field("postgres_host", &self.postgres_host)
            .field("postgres_port", &self.postgres_port)
            .field("postgres_db", &self.postgres_db)
            .field("postgres_user", &self.postgres_user)
            .field("postgres_password", &"[REDACTED]")
            .field("storage_mode", &self.storage_mode)
            .field("storage_pool_max_connections", &self.storage_pool_max_connections)
            .field("storage_connect_retry_delay_ms", &self.storage_connect_retry_delay_ms)
            .field("storage_connect_max_attempts", &self.storage_connect_max_attempts)
            .field("stats_log_interval", &self.stats_log_interval)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default())
    }

    /// Build from an explicit environment source (defaults fill the gaps).
    pub fn from_source(env: config::Environment) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("kafka_bootstrap_servers", "kafka:9092")?
            .set_default("kafka_topic", "raw_data_events")?
            .set_default("kafka_group_id", "feature-ingestor-group")?
            .set_default("kafka_auto_commit_interval_ms", 5000)?
            .set_default("kafka_session_timeout_ms", 30000)?
            .set_default("kafka_startup_timeout_ms", 10000)?
            .set_default("kafka_recv_error_backoff_ms", 1000)?
            .set_default("postgres_host", "postgres")?
            .set_default("postgres_port", 5432)?
            .set_default("postgres_db", "feature_store_db")?
            .set_default("postgres_user", "postgres")?
            .set_default("postgres_password", "postgres")?
            .set_default("storage_mode", "per_call")?
            .set_default("storage_pool_max_connections", 5)?
            .set_default("storage_connect_retry_delay_ms", 3000)? // 3 seconds
            .set_default("stats_log_interval", 1000)?
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.kafka_bootstrap_servers.trim().is_empty() {
            return Err(anyhow!("Kafka bootstrap servers are required"));
        }

        if self.kafka_topic.trim().is_empty() {
            return Err(anyhow!("Kafka topic is required"));
        }

        if self.kafka_group_id.trim().is_empty() {
            return Err(anyhow!("Kafka consumer group id is required"));
        }

        if self.postgres_host.trim().is_empty() || self.postgres_db.trim().is_empty() {
            return Err(anyhow!("PostgreSQL host and database are required"));
        }

        if self.postgres_port == 0 {
            return Err(anyhow!("PostgreSQL port must be greater than 0"));
        }

        if self.kafka_auto_commit_interval_ms == 0 {
            return Err(anyhow!("Kafka auto commit interval must be greater than 0"));
        }

        if self.kafka_session_timeout_ms == 0 {
            return Err(anyhow!("Kafka session timeout must be greater than 0"));
        }

        if self.kafka_startup_timeout_ms == 0 {
            return Err(anyhow!("Kafka startup timeout must be greater than 0"));
        }

        if self.kafka_recv_error_backoff_ms == 0 {
            return Err(anyhow!("Kafka receive error backoff must be greater than 0"));
        }

        if self.storage_connect_retry_delay_ms == 0 {
            return Err(anyhow!("Storage connect retry delay must be greater than 0"));
        }

        if self.storage_mode == StorageMode::Pooled && self.storage_pool_max_connections == 0 {
            return Err(anyhow!("Pool size must be greater than 0 in pooled mode"));
        }

        if self.stats_log_interval == 0 {
            return Err(anyhow!("Stats log interval must be greater than 0"));
        }

        Ok(())
    }

    pub fn pg_connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.postgres_host)
            .port(self.postgres_port)
            .database(&self.postgres_db)
            .username(&self.postgres_user)
            .password(&self.postgres_password)
    }

    /// Policy for acquiring store connections: fixed delay, unbounded unless
    /// `storage_connect_max_attempts` is set.
    pub fn connect_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Backoff::Fixed(Duration::from_millis(self.storage_connect_retry_delay_ms)),
            ..presets::database_connect()
        }
        .with_max_attempts(self.storage_connect_max_attempts)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.kafka_startup_timeout_ms)
    }

    pub fn recv_error_backoff(&self) -> Duration {
        Duration::from_millis(self.kafka_recv_error_backoff_ms)
    }
}
