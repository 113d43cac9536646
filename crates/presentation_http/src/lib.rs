//! HTTP presentation layer for the row-level security demo
//!
//! Bearer-authenticated REST API over the tenant-scoped sensitive data
//! services.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorResponse, set_expose_internal_errors};
pub use middleware::{JwtAuthLayer, RequestIdLayer, RequireAdministrator, ValidatedJson};
pub use routes::create_router;
pub use state::AppState;
