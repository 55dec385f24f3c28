use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::scoring::ScoringError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ScoringError),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            AppError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, (*reason).into()),
            AppError::ModelUnavailable(e) => {
                tracing::error!("Scoring failed: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "No production model is available".into(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
