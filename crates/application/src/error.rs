//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Lookup or write matched no visible row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tenant claim missing/invalid, or entity owned by another tenant
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Authenticated but lacking the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Input rejected before touching storage
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage failure (constraint violation, connectivity)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Operation cancelled before commit
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Not-found error for an entity key
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }

    /// Whether the caller caused the error
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Domain(_)
                | Self::NotFound(_)
                | Self::NotAuthorized(_)
                | Self::Forbidden(_)
                | Self::Validation(_)
        )
    }

    /// Check if this error is retryable
    ///
    /// Writes carry no idempotency key, so nothing is.
    pub const fn is_retryable(&self) -> bool {
        false
    }
}
