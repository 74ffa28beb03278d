//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::repository::StoreError;
use crate::service::cancel::CancelError;
use crate::service::log::LogError;
use crate::service::run::RunError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    StorageError(StoreError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::StorageError(err) => {
                tracing::error!("Storage error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StorageError(err)
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LogError::ValidationError(msg) => ApiError::BadRequest(msg),
            LogError::Storage(err) => ApiError::StorageError(err),
            LogError::Encoding(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RunError::AlreadyExists(_) | RunError::InvalidState(_) => {
                ApiError::Conflict(err.to_string())
            }
            RunError::ValidationError(msg) => ApiError::BadRequest(msg),
            RunError::Storage(err) => ApiError::StorageError(err),
        }
    }
}

impl From<CancelError> for ApiError {
    fn from(err: CancelError) -> Self {
        match err {
            CancelError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CancelError::InvalidState(msg) => ApiError::Conflict(msg),
            CancelError::ValidationError(msg) => ApiError::BadRequest(msg),
            CancelError::Storage(err) => ApiError::StorageError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
