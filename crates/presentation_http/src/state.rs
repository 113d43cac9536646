//! Application state shared across handlers

use std::sync::Arc;

use application::{DatabaseHealthPort, SensitiveDataService, TenantService};
use infrastructure::{AppConfig, AsyncDatabase, JwtService, SqliteDatabaseHealth, SqliteRepository};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Tenant-scoped sensitive data use cases
    pub sensitive_data: Arc<SensitiveDataService>,
    /// Tenant reference data
    pub tenants: Arc<TenantService>,
    /// Readiness probe
    pub database_health: Arc<dyn DatabaseHealthPort>,
    /// Bearer token issuing and verification
    pub jwt: Arc<JwtService>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("jwt", &self.jwt)
            .field("environment", &self.config.environment)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the SQLite adapters behind the application services
    pub fn from_database(db: &AsyncDatabase, config: AppConfig) -> Self {
        Self {
            sensitive_data: Arc::new(SensitiveDataService::new(Arc::new(SqliteRepository::new(db)))),
            tenants: Arc::new(TenantService::new(Arc::new(SqliteRepository::new(db)))),
            database_health: Arc::new(SqliteDatabaseHealth::new(db)),
            jwt: Arc::new(JwtService::new(&config.auth)),
            config: Arc::new(config),
        }
    }
}
