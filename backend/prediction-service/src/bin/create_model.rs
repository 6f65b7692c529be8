//! Train a demo logistic model on synthetic data and write the artifact.
//!
//! Usage: `create-model [OUTPUT_PATH]` (defaults to `$MODEL_PATH`, then `model.json`)

use anyhow::{Context, Result};
use prediction_service::model::synthetic_dataset;
use prediction_service::{LogisticModel, TrainingParams};
use tracing::info;

const ROWS: usize = 100;
const FEATURES: usize = 3;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let output = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MODEL_PATH").ok())
        .unwrap_or_else(|| "model.json".to_string());

    let mut rng = rand::thread_rng();
    let (samples, labels) = synthetic_dataset(ROWS, FEATURES, &mut rng);

    let model = LogisticModel::fit(&samples, &labels, TrainingParams::default())
        .context("Training failed")?;
    info!(
        accuracy = model.accuracy(&samples, &labels),
        "Trained logistic model on {} rows x {} features",
        ROWS,
        FEATURES
    );

    model
        .save(&output)
        .with_context(|| format!("Failed to write model to {}", output))?;
    info!("Model saved to {}", output);
    Ok(())
}
