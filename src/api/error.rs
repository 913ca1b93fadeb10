use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use crate::manager::ManagerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload exceeds limit of {0} bytes")]
    PayloadTooLarge(usize),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("work queue is full, retry later")]
    QueueFull,
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::QueueFull | ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::QueueFull => "QUEUE_FULL",
            ApiError::ShuttingDown => "SHUTTING_DOWN",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<ManagerError> for ApiError {
    fn from(value: ManagerError) -> Self {
        match value {
            ManagerError::Validation(e) => ApiError::InvalidPayload(e.to_string()),
            ManagerError::QueueFull => ApiError::QueueFull,
            ManagerError::ShuttingDown => ApiError::ShuttingDown,
            ManagerError::NotFound(id) => ApiError::NotFound(format!("task {id}")),
            e @ (ManagerError::Persistence(_) | ManagerError::Restore(_)) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{TaskId, ValidationError};

    #[test]
    fn test_manager_errors_map_to_codes() {
        let cases = [
            (
                ManagerError::Validation(ValidationError::EmptyUrls),
                StatusCode::BAD_REQUEST,
                "INVALID_PAYLOAD",
            ),
            (
                ManagerError::QueueFull,
                StatusCode::SERVICE_UNAVAILABLE,
                "QUEUE_FULL",
            ),
            (
                ManagerError::ShuttingDown,
                StatusCode::SERVICE_UNAVAILABLE,
                "SHUTTING_DOWN",
            ),
            (
                ManagerError::NotFound(TaskId::from("abc")),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.code(), code);
        }
    }
}
