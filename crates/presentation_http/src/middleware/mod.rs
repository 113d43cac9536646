//! HTTP middleware components
//!
//! Request correlation, bearer authentication with the administrator role
//! gate, and validated JSON bodies.

pub mod auth;
pub mod request_id;
pub mod validation;

pub use auth::{ADMINISTRATOR_ROLE, JwtAuth, JwtAuthLayer, RequireAdministrator};
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer, RequestSpan};
pub use validation::ValidatedJson;
