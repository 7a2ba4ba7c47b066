//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::relay::RelayError;
use crate::signature::SignatureError;
use crate::store::StoreError;

/// Generic message for relay failures that carry no upstream text.
const RELAY_UNAVAILABLE: &str = "Summarization service unavailable";

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation**: missing or malformed caller input (`MissingInput`, `InvalidRequest`)
/// - **Authorization**: unknown, revoked, or unreadable license (`InvalidLicense`)
/// - **Upstream**: relay unreachable, errored, or timed out (`Relay`)
/// - **Malformed upstream**: relay answered with something that is not a summary
/// - **Persistence**: record store failures (`Store`)
/// - **Signature**: payment webhook failed authentication
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required field was absent or empty.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// License key was never issued, has been revoked, or could not be read.
    ///
    /// Returns HTTP 401 Unauthorized. The three cases are indistinguishable.
    #[error("Invalid or inactive license key")]
    InvalidLicense,

    /// AI relay could not produce a completion.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// AI relay answered with text that is not a valid summary.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Malformed relay response: {0}")]
    MalformedResponse(String),

    /// Record store operation failed.
    ///
    /// Returns HTTP 500 Internal Server Error (hides details from client).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment webhook signature or payload rejected.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(#[from] SignatureError),
}

impl AppError {
    /// Stable snake_case code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingInput(_) => "missing_input",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::InvalidLicense => "invalid_license",
            AppError::Relay(_) => "relay_error",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::Store(_) => "internal_error",
            AppError::InvalidSignature(_) => "invalid_signature",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingInput(_)
            | AppError::InvalidRequest(_)
            | AppError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidLicense => StatusCode::UNAUTHORIZED,
            AppError::Relay(_) | AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Store and signature details are logged, never returned. Relay errors pass
/// through the upstream's own message when it supplied one.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::MissingInput(_) | AppError::InvalidLicense => self.to_string(),
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::Relay(err) => err
                .upstream_message()
                .map(str::to_string)
                .unwrap_or_else(|| RELAY_UNAVAILABLE.to_string()),
            AppError::MalformedResponse(_) => {
                "Summarization service returned an unreadable response".to_string()
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "store failure");
                "An internal error occurred".to_string()
            }
            AppError::InvalidSignature(err) => {
                tracing::warn!(error = %err, "rejected payment webhook");
                "Webhook signature verification failed".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_hide_detail() {
        let err = AppError::Store(StoreError::Unavailable("connection refused on 10.0.0.5".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }

    #[test]
    fn relay_status_mapping() {
        let err = AppError::Relay(RelayError::Timeout);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "relay_error");
        assert_eq!(AppError::InvalidLicense.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::MissingInput("text").status(), StatusCode::BAD_REQUEST);
    }
}
