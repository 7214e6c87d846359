//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Only envelope-level problems ever reach webhook callers; extraction
//! misses and coercion failures are absorbed by the normalization engine.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: field \"event\" is required",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1099 | Validation      | 400 Bad Request           |
/// | 1100–1199 | Authentication  | 401 Unauthorized          |
/// | 3000–3999 | Server          | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request body is not valid JSON.
    #[error("invalid JSON payload")]
    InvalidJson,

    /// Envelope validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook token missing, mismatched, or no secret configured.
    #[error("unauthorized")]
    Unauthorized {
        /// Header the caller is expected to send the token in.
        header: String,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidJson => 1000,
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized { .. } => 1100,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Unauthorized { header } => Some(format!(
                "provide a valid token via the `{header}` header or the Authorization: Bearer header"
            )),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for GatewayError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
