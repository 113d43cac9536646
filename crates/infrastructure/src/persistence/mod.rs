//! Persistence module
//!
//! SQLite storage behind the generic repository port: connection pool and
//! migrations, the predicate-to-SQL compiler, per-entity row mappings and
//! the tenant-scoped repository.

pub mod async_connection;
pub mod database_health;
pub mod entity;
pub mod error;
pub mod repository;
pub mod sql;
pub mod tenant_session;

pub use async_connection::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError};
pub use database_health::SqliteDatabaseHealth;
pub use entity::SqlEntity;
pub use error::map_sqlx_error;
pub use repository::{SqliteRepository, SqliteRepositoryTransaction};
pub use tenant_session::{NoopTenantSession, SqliteTenantSession, TenantSession};
