use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::autofill::preferences::StoreError;
use crate::autofill::profile::ProfileError;
use crate::forms::extractor::ExtractionError;
use crate::platform::ClassificationError;
use crate::submission::orchestrator::SubmissionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidJobUrl(#[from] ClassificationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidJobUrl(e) => (StatusCode::BAD_REQUEST, "INVALID_JOB_URL", e.to_string()),
            AppError::Extraction(ExtractionError::Timeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                "EXTRACTION_TIMEOUT",
                "Timed out reading the job page".to_string(),
            ),
            AppError::Extraction(e) => {
                tracing::warn!("Extraction error: {e}");
                (StatusCode::BAD_GATEWAY, "EXTRACTION_FAILED", e.to_string())
            }
            AppError::Submission(e) if e.is_retryable() => {
                tracing::warn!("Submission error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SUBMISSION_TRANSIENT",
                    e.to_string(),
                )
            }
            AppError::Submission(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SUBMISSION_REJECTED",
                e.to_string(),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Profile(e) => {
                tracing::error!("Profile error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROFILE_ERROR",
                    "The user profile could not be loaded".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
