use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Risk prediction API is running" }))
}

/// Liveness only; does not touch the registry or the model cache.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
