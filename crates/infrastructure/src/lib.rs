//! Infrastructure layer - Adapters for external systems
//!
//! Implements the ports defined in the application layer: the SQLite
//! repository and health adapter, plus configuration, logging and
//! bearer-token plumbing.

pub mod auth;
pub mod config;
pub mod persistence;
pub mod telemetry;
pub mod validation;

pub use auth::{AuthError, Claims, IssuedToken, JwtService};
pub use config::{
    AppConfig, AuthConfig, DatabaseConfig, Environment, LogFormat, ServerConfig, TelemetryConfig,
};
pub use persistence::{
    AsyncDatabase, SqliteDatabaseHealth, SqliteRepository, SqliteTenantSession, TenantSession,
};
pub use telemetry::{TelemetryError, init_telemetry};
pub use validation::{SecurityValidator, SecurityWarning, WarningSeverity};
