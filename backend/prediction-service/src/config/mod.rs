use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // HTTP server config
    pub http_host: String,
    pub http_port: u16,

    // Model artifact
    pub model_path: String,
    pub model_version: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default())
    }

    pub fn from_source(env: config::Environment) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("http_host", "0.0.0.0")?
            .set_default("http_port", 8000)?
            .set_default("model_path", "model.json")?
            .set_default("model_version", "1.0.0")?
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.http_port == 0 {
            return Err(anyhow!("HTTP port must be greater than 0"));
        }

        if self.model_path.trim().is_empty() {
            return Err(anyhow!("Model path is required"));
        }

        if self.model_version.trim().is_empty() {
            return Err(anyhow!("Model version is required"));
        }

        Ok(())
    }
}
