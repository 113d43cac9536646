//! SQLite database health adapter
//!
//! Implements the `DatabaseHealthPort` over the sqlx connection pool.

use std::time::Instant;

use application::error::ApplicationError;
use application::ports::{DatabaseHealth, DatabaseHealthPort};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use super::AsyncDatabase;

/// SQLite database health adapter
#[derive(Clone)]
pub struct SqliteDatabaseHealth {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabaseHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabaseHealth")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl SqliteDatabaseHealth {
    #[must_use]
    pub fn new(db: &AsyncDatabase) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl DatabaseHealthPort for SqliteDatabaseHealth {
    #[instrument(skip(self))]
    async fn is_available(&self) -> bool {
        match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
        {
            Ok(_) => {
                debug!("Database health check passed");
                true
            },
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            },
        }
    }

    #[instrument(skip(self))]
    async fn check_health(&self) -> Result<DatabaseHealth, ApplicationError> {
        let start = Instant::now();

        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database health check failed");
                ApplicationError::Persistence(format!("Health check query failed: {e}"))
            })?;

        let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let pool_size = self.pool.size();

        debug!(
            version = %version,
            pool_size = pool_size,
            response_time_ms = response_time_ms,
            "Database health check passed"
        );

        Ok(DatabaseHealth::reachable(format!("SQLite {version}"))
            .with_pool_size(pool_size)
            .with_response_time(response_time_ms))
    }
}
