use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::posts::PostError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Post not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("uploads are not enabled")]
    UploadsUnavailable,

    #[error("upload failed: {0}")]
    UploadFailed(String),
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound => AppError::NotFound,
            PostError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Post not found" })),
            AppError::Validation(msg) | AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::UploadsUnavailable => {
                tracing::warn!("Upload rejected: uploads are not enabled");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "uploads are not enabled" }),
                )
            }
            AppError::UploadFailed(detail) => {
                tracing::error!("Upload failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "upload failed", "detail": detail }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
