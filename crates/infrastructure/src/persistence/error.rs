//! Shared error mapping for sqlx persistence layer

use application::error::ApplicationError;

/// Map a sqlx error to an application-layer error
///
/// Constraint violations keep the database message so the caller can tell
/// which constraint failed. Nothing here is retried.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ApplicationError::Persistence(format!("Unique constraint violated: {db_err}"))
        },
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            ApplicationError::Persistence(format!("Foreign key constraint violated: {db_err}"))
        },
        sqlx::Error::Database(db_err) => {
            ApplicationError::Persistence(format!("Database error: {db_err}"))
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ApplicationError::Persistence(format!("Database unavailable: {e}"))
        },
        other => ApplicationError::Internal(format!("Database error: {other}")),
    }
}
