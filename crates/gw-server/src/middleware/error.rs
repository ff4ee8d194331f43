//! Error handling for HTTP responses
//!
//! Errors are serialized as `{"detail": <message>}`, the shape the
//! dashboard consumes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Application error that can be converted to an HTTP response
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                detail: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiErrorResponse::unauthorized("nope").status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiErrorResponse::not_found("missing").status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiErrorResponse::internal_error("boom").status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiErrorResponse::service_unavailable("down").status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_body_message() {
        let err = ApiErrorResponse::unauthorized("Unauthorized access.");
        assert_eq!(err.body.detail, "Unauthorized access.");
    }
}
