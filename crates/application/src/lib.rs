//! Application layer - Use cases and orchestration
//!
//! Defines the repository and health ports, the per-request context that
//! carries the caller's tenant into every data access, and the services
//! the HTTP layer calls.

pub mod blocking;
pub mod error;
pub mod ports;
pub mod request_context;
pub mod services;

pub use blocking::BlockingRepository;
pub use error::ApplicationError;
pub use ports::*;
pub use request_context::RequestContext;
pub use services::*;
