use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ApplicationRecord, RiskPrediction};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub data: Vec<ApplicationRecord>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<RiskPrediction>,
}

/// Score a batch. Predictions come back in request order.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    metrics::counter!("predict_requests_total").increment(1);
    let Json(request) = payload?;

    let started = Instant::now();
    let predictions = state.scoring.score(&request.data).await?;
    metrics::histogram!("scoring_latency_seconds").record(started.elapsed().as_secs_f64());

    for p in &predictions {
        metrics::counter!("predictions_total", "risk_level" => p.risk_level.as_str()).increment(1);
    }
    tracing::debug!(records = predictions.len(), "Batch scored");

    Ok(Json(PredictResponse { predictions }))
}
