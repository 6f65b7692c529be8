use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use validator::Validate;

use crate::context::AppContext;
use crate::error::{PredictionError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    pub user_id: String,
    #[validate(length(min = 1, message = "at least one feature is required"))]
    pub features_for_prediction: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub user_id: String,
    pub prediction_score: f64,
    pub model_version: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/predict", web::post().to(predict))
        .route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check));
}

/// POST /predict
pub async fn predict(
    ctx: web::Data<AppContext>,
    req: web::Json<PredictionRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    req.validate()?;

    let model = ctx.model()?;

    if req.features_for_prediction.len() != model.expected_width() {
        return Err(PredictionError::FeatureCountMismatch {
            expected: model.expected_width(),
            actual: req.features_for_prediction.len(),
        });
    }

    let prediction_score = model
        .predict_proba(&req.features_for_prediction)
        .map_err(|e| {
            error!(user_id = %req.user_id, "Prediction failed: {}", e);
            e
        })?;

    debug!(user_id = %req.user_id, score = prediction_score, "Prediction served");

    Ok(HttpResponse::Ok().json(PredictionResponse {
        user_id: req.user_id,
        prediction_score,
        model_version: ctx.model_version().to_string(),
    }))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "prediction-service"
    }))
}

async fn readiness_check(ctx: web::Data<AppContext>) -> HttpResponse {
    if ctx.is_ready() {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "model_version": ctx.model_version()
        }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "model not loaded"
        }))
    }
}
