//! Async database connection using sqlx
//!
//! Provides async database operations using sqlx with SQLite.
//! Migrations are managed via sqlx's `migrate!()` macro using SQL
//! files in the workspace `migrations/` directory; they create the
//! `tenants` and `sensitive_data` tables and seed the demo tenants.

use std::{path::Path, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;

/// Error type for async database operations
#[derive(Debug, thiserror::Error)]
pub enum AsyncDatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for async database connection
#[derive(Debug, Clone)]
pub struct AsyncDatabaseConfig {
    /// Database URL (e.g., "sqlite:data.db" or "sqlite::memory:")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to keep open
    pub min_connections: u32,
    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,
    /// Enable foreign keys
    pub foreign_keys: bool,
}

impl Default for AsyncDatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:rls-demo.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            wal_mode: true,
            foreign_keys: true,
        }
    }
}

impl AsyncDatabaseConfig {
    /// Create an in-memory database configuration for testing
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1, // every connection would get its own database
            min_connections: 1,
            wal_mode: false,
            foreign_keys: true,
        }
    }

    /// Create a file-based database configuration
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().display().to_string();
        Self {
            url: format!("sqlite:{path_str}"),
            ..Default::default()
        }
    }

    /// Whether the database lives only as long as its connection
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

impl From<&DatabaseConfig> for AsyncDatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        if config.path == ":memory:" {
            return Self::in_memory();
        }
        Self {
            max_connections: config.max_connections.max(1),
            ..Self::file(&config.path)
        }
    }
}

/// Async database connection pool
#[derive(Debug, Clone)]
pub struct AsyncDatabase {
    pool: SqlitePool,
}

impl AsyncDatabase {
    /// Create a new async database connection pool
    #[instrument(skip_all, fields(url = %config.url))]
    pub async fn new(config: &AsyncDatabaseConfig) -> Result<Self, AsyncDatabaseError> {
        if config.max_connections == 0 {
            return Err(AsyncDatabaseError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(config.foreign_keys);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections);
        if config.is_in_memory() {
            // Closing the last connection drops the database
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        if config.wal_mode && !config.is_in_memory() {
            sqlx::query("PRAGMA journal_mode=WAL")
                .execute(&pool)
                .await?;
            debug!("WAL mode enabled");
        }

        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&pool)
            .await?;

        if config.wal_mode && !config.is_in_memory() {
            sqlx::query("PRAGMA synchronous=NORMAL")
                .execute(&pool)
                .await?;
        }

        info!(
            max_connections = config.max_connections,
            "Async database pool created"
        );

        Ok(Self { pool })
    }

    /// Create an in-memory database for testing
    pub async fn in_memory() -> Result<Self, AsyncDatabaseError> {
        Self::new(&AsyncDatabaseConfig::in_memory()).await
    }

    /// Open the configured database and apply migrations when enabled
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AsyncDatabaseError> {
        let db = Self::new(&AsyncDatabaseConfig::from(config)).await?;
        if config.run_migrations {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// Get the underlying pool for raw queries
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations using the workspace migration SQL files
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), AsyncDatabaseError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Close all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_in_memory_database() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        let _ = db.pool();
    }

    #[tokio::test]
    async fn migrations_create_tables_and_seed() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let tenants: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tenants")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tenants.0, 3);

        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sensitive_data WHERE tenant_id = 2")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows.0, 4);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn name_is_unique_per_tenant() {
        let db = AsyncDatabase::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO sensitive_data (type, name, tenant_id, track_creation_time, track_last_write_time) \
             VALUES (0, 'Nom du locataire 1', 1, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00')",
        )
        .execute(db.pool())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn wal_mode_for_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("rls_wal.db");

        let config = AsyncDatabaseConfig::file(&db_path);
        let db = AsyncDatabase::new(&config).await.unwrap();
        db.migrate().await.unwrap();

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0.to_lowercase(), "wal");

        db.close().await;
    }

    #[test]
    fn config_from_database_config() {
        let memory = AsyncDatabaseConfig::from(&DatabaseConfig {
            path: ":memory:".to_string(),
            max_connections: 8,
            run_migrations: true,
        });
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);

        let file = AsyncDatabaseConfig::from(&DatabaseConfig {
            path: "data/rls.db".to_string(),
            max_connections: 3,
            run_migrations: false,
        });
        assert_eq!(file.url, "sqlite:data/rls.db");
        assert_eq!(file.max_connections, 3);
        assert!(file.wal_mode);
    }

    #[tokio::test]
    async fn zero_connections_is_rejected() {
        let config = AsyncDatabaseConfig {
            max_connections: 0,
            ..AsyncDatabaseConfig::in_memory()
        };
        assert!(matches!(
            AsyncDatabase::new(&config).await,
            Err(AsyncDatabaseError::Config(_))
        ));
    }
}
