use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictionError>;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Incorrect feature count: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Model artifact error: {0}")]
    ModelArtifact(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for PredictionError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        // Internal details stay in the logs
        let message = match self {
            PredictionError::PredictionFailed(_) | PredictionError::ModelArtifact(_) => {
                "Prediction failed".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(code).json(ErrorResponse {
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            PredictionError::FeatureCountMismatch { .. } | PredictionError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictionError::PredictionFailed(_) | PredictionError::ModelArtifact(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for PredictionError {
    fn from(err: validator::ValidationErrors) -> Self {
        PredictionError::Validation(err.to_string())
    }
}
