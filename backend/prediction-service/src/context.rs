use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{PredictionError, Result};
use crate::model::{LogisticModel, ScoringModel};

/// Request-scoped view of everything the handlers need, built once at startup
/// and shared through `web::Data`.
pub struct AppContext {
    model: Option<Arc<dyn ScoringModel>>,
    model_version: String,
}

impl AppContext {
    pub fn new(model: Option<Arc<dyn ScoringModel>>, model_version: impl Into<String>) -> Self {
        Self {
            model,
            model_version: model_version.into(),
        }
    }

    /// Load the configured artifact. A load failure is logged and leaves the
    /// model slot empty; predictions then answer 503.
    pub fn from_config(config: &Config) -> Self {
        let model: Option<Arc<dyn ScoringModel>> = match LogisticModel::load(&config.model_path) {
            Ok(model) => {
                info!(
                    path = %config.model_path,
                    version = %config.model_version,
                    width = model.expected_width(),
                    "Model loaded"
                );
                Some(Arc::new(model) as Arc<dyn ScoringModel>)
            }
            Err(e) => {
                error!("Model load failed: {}", e);
                None
            }
        };

        Self::new(model, config.model_version.clone())
    }

    pub fn model(&self) -> Result<&dyn ScoringModel> {
        self.model.as_deref().ok_or(PredictionError::ModelNotLoaded)
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }
}
