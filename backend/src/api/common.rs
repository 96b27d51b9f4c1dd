//! Response envelope and error conversion for HTTP handlers.
//!
//! # Response Format
//! Every response is an [`ApiResponse`]. Failures carry:
//! - `message`: Human-readable message
//! - `error.error_type`: Machine-readable error category
//!
//! # Error Handling Flow
//! 1. Service layer returns a `ServiceError`
//! 2. `service_error_to_http` converts it to a status code and JSON body
//! 3. Internal errors are replaced with a generic message

use crate::errors::ServiceError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Request timestamp
    pub timestamp: String,
}

/// Error details for failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response
    pub fn error(message: impl Into<String>, error_type: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Builds the `(StatusCode, String)` rejection used by handlers.
pub fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    error_type: &str,
) -> (StatusCode, String) {
    let error_response = ApiResponse::<()>::error(message, error_type);
    (
        status,
        serde_json::to_string(&error_response).unwrap_or_default(),
    )
}

/// Converts ServiceError to appropriate HTTP response with standard format
pub fn service_error_to_http(error: ServiceError) -> (StatusCode, String) {
    let error_type = error.error_type();
    let (status, message) = match error {
        ServiceError::Validation { message } => (StatusCode::BAD_REQUEST, message),
        ServiceError::Conflict { entity, .. } => (
            StatusCode::CONFLICT,
            format!("{} with this username or email already exists", entity),
        ),
        ServiceError::NotFound { entity, .. } => {
            (StatusCode::NOT_FOUND, format!("{} does not exist", entity))
        }
        ServiceError::Authentication { message } => (StatusCode::UNAUTHORIZED, message),
        ServiceError::InvalidToken { message } => (StatusCode::UNAUTHORIZED, message),
        ServiceError::TokenReuse { .. } => (
            StatusCode::UNAUTHORIZED,
            "Refresh token is expired or used".to_string(),
        ),
        ServiceError::Dependency { message } => {
            tracing::error!("Dependency error: {}", message);
            (StatusCode::BAD_GATEWAY, message)
        }
        ServiceError::Internal { message } => {
            tracing::error!("Internal error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    error_response(status, message, error_type)
}
