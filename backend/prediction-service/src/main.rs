use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use prediction_service::{configure, AppContext, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,prediction_service=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting prediction-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    let context = web::Data::new(AppContext::from_config(&config));

    info!("Starting HTTP server on {}:{}", config.http_host, config.http_port);

    HttpServer::new(move || App::new().app_data(context.clone()).configure(configure))
        .bind((config.http_host.as_str(), config.http_port))
        .context("Failed to bind HTTP server")?
        .run()
        .await
        .context("HTTP server error")
}
