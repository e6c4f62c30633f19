use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::store::StoreError;

/// Structured API error returned to HTTP clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(?err, "message store error");
        Self::internal("An internal error occurred")
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Storage(err) => err.into(),
            RelayError::ShuttingDown => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "SHUTTING_DOWN".to_string(),
                message: "The service is shutting down".to_string(),
            },
            other => Self::bad_request(other.to_string()),
        }
    }
}

/// Errors raised while handling a real-time event.
///
/// None of these close the connection; they are reported back to the
/// originating client as an `error` event.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("message could not be stored: {0}")]
    Storage(#[from] StoreError),
    #[error("relay is shutting down")]
    ShuttingDown,
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("malformed payload: {0}")]
    BadPayload(String),
}

impl RelayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wire code sent in the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::UnknownEvent(_) => "UNKNOWN_EVENT",
            Self::BadPayload(_) => "BAD_PAYLOAD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_errors_map_to_http_status() {
        let api: ApiError = RelayError::invalid("patientId is required").into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.message.contains("patientId"));

        let api: ApiError = RelayError::Storage(StoreError::Unavailable("down".into())).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, "INTERNAL_ERROR");
    }

    #[test]
    fn storage_error_code() {
        let err = RelayError::from(StoreError::Query("insert failed".into()));
        assert_eq!(err.code(), "STORAGE_ERROR");
    }
}
