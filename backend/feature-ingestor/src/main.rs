use anyhow::{Context, Result};
use feature_ingestor::{
    Config, IngestionLoop, KafkaSource, PerCallGateway, PooledGateway, StorageGateway, StorageMode,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,feature_ingestor=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting feature-ingestor");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    info!(?config, "Configuration loaded and validated");

    // Storage first: blocks until PostgreSQL accepts connections
    let retry = config.connect_retry_policy();
    let gateway: Arc<dyn StorageGateway> = match config.storage_mode {
        StorageMode::PerCall => Arc::new(PerCallGateway::new(config.pg_connect_options(), retry)),
        StorageMode::Pooled => Arc::new(
            PooledGateway::connect(
                config.pg_connect_options(),
                config.storage_pool_max_connections,
                &retry,
            )
            .await
            .context("Failed to create PostgreSQL pool")?,
        ),
    };

    gateway
        .ensure_schema()
        .await
        .context("Failed to initialize user_features table")?;

    // Broker failures here are fatal; the supervisor restarts the process
    let source = KafkaSource::connect(&config).context("Failed to start Kafka consumer")?;
    info!(topic = source.topic(), "Consuming messages");

    let stats = IngestionLoop::new(source, gateway)
        .with_stats_log_interval(config.stats_log_interval)
        .with_recv_error_backoff(config.recv_error_backoff())
        .run()
        .await
        .context("Ingestion loop stopped")?;

    info!(received = stats.received, stored = stats.stored, "feature-ingestor finished");
    Ok(())
}
