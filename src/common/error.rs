// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;
use crate::auth::error::AuthError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    BadRequest(String),
    ValidationError(String),
    InternalServer(String),
    ServiceUnavailable(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Auth(e) => write!(f, "Auth Error: {}", e),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
        }
    }
}

/// JSON error response structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::Auth(e) if e.is_internal() => {
                error!(error = %e, "Infrastructure failure during authentication");
                (
                    e.status(),
                    "Internal server error".to_string(),
                    e.code(),
                )
            }
            ApiError::Auth(e) => (e.status(), e.to_string(), e.code()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::InternalServer(msg) => {
                error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}
