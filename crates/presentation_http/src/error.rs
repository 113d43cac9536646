//! API error handling
//!
//! Maps application errors onto HTTP statuses with a uniform JSON body.
//! Outside development, server-side error details are withheld.

use std::sync::atomic::{AtomicBool, Ordering};

use application::ApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

const GENERIC_MESSAGE: &str = "An error occurred processing your request";

/// Whether server-side error details reach the client
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(true);

/// Configure whether internal error details are included in responses
///
/// Production deployments turn this off.
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::SeqCst);
}

fn should_expose_details() -> bool {
    EXPOSE_INTERNAL_ERRORS.load(Ordering::SeqCst)
}

/// Replace messages that mention storage internals
///
/// SQLite constraint and I/O messages name tables, columns and file paths.
fn sanitize_error_message(msg: &str) -> String {
    if should_expose_details() {
        return msg.to_string();
    }

    let sensitive_patterns = [
        "sqlite",
        "constraint",
        "database",
        "no such table",
        "no such column",
        ".db",
        "/home/",
        "/var/",
        "C:\\",
        "panicked at",
        ".rs:",
    ];
    let lower = msg.to_lowercase();
    if sensitive_patterns
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
    {
        return GENERIC_MESSAGE.to_string();
    }
    msg.to_string()
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let (message, details) = match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => (sanitize_error_message(&msg), None),
            Self::Unauthorized(msg) => {
                // Never tell the caller which check failed in production
                let message = if should_expose_details() {
                    msg
                } else {
                    "Authentication required".to_string()
                };
                (message, None)
            },
            Self::Forbidden(msg) => {
                let message = if should_expose_details() {
                    msg
                } else {
                    "Access denied".to_string()
                };
                (message, None)
            },
            Self::ServiceUnavailable(msg) => {
                let message = if should_expose_details() {
                    msg
                } else {
                    "Service temporarily unavailable".to_string()
                };
                (message, None)
            },
            Self::Internal(msg) => {
                error!(error = %msg, "Request failed");
                let details = should_expose_details().then_some(msg);
                ("An internal error occurred".to_string(), details)
            },
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::Domain(e) => Self::BadRequest(e.to_string()),
            ApplicationError::Validation(msg) => Self::BadRequest(msg),
            ApplicationError::NotFound(msg) => Self::NotFound(msg),
            ApplicationError::NotAuthorized(msg) => {
                warn!(reason = %msg, "Tenant check failed");
                Self::Unauthorized(msg)
            },
            ApplicationError::Forbidden(msg) => Self::Forbidden(msg),
            ApplicationError::Cancelled => Self::Internal("operation cancelled".to_string()),
            ApplicationError::Persistence(msg)
            | ApplicationError::Configuration(msg)
            | ApplicationError::Internal(msg) => Self::Internal(msg),
        }
    }
}
