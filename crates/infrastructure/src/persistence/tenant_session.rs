//! Storage-side tenant hardening
//!
//! Repository filtering is what isolates tenants. A [`TenantSession`] can
//! additionally publish the caller's tenant on the connection before every
//! statement, so storage-side policies (triggers, views) can check rows
//! against it.

use std::fmt;

use async_trait::async_trait;
use domain::TenantId;
use sqlx::SqliteConnection;
use tracing::trace;

/// Publishes the current tenant on a connection
#[async_trait]
pub trait TenantSession: fmt::Debug + Send + Sync {
    async fn set_current_tenant(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: TenantId,
    ) -> Result<(), sqlx::Error>;
}

/// Session that publishes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTenantSession;

#[async_trait]
impl TenantSession for NoopTenantSession {
    async fn set_current_tenant(
        &self,
        _conn: &mut SqliteConnection,
        _tenant_id: TenantId,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// Session that keeps the tenant in the per-connection `temp.tenant_session` table
///
/// Triggers or views may read it with
/// `SELECT tenant_id FROM temp.tenant_session`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTenantSession;

impl SqliteTenantSession {
    /// Tenant currently published on `conn`, if any
    pub async fn current_tenant(conn: &mut SqliteConnection) -> Result<Option<TenantId>, sqlx::Error> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'table' AND name = 'tenant_session'",
        )
        .fetch_one(&mut *conn)
        .await?;
        if exists == 0 {
            return Ok(None);
        }

        let tenant: Option<i32> = sqlx::query_scalar("SELECT tenant_id FROM temp.tenant_session LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;
        Ok(tenant.map(TenantId::new))
    }
}

#[async_trait]
impl TenantSession for SqliteTenantSession {
    async fn set_current_tenant(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: TenantId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TEMP TABLE IF NOT EXISTS tenant_session (tenant_id INTEGER NOT NULL)")
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM temp.tenant_session")
            .execute(&mut *conn)
            .await?;
        sqlx::query("INSERT INTO temp.tenant_session (tenant_id) VALUES (?)")
            .bind(tenant_id.value())
            .execute(&mut *conn)
            .await?;

        trace!(tenant_id = %tenant_id, "Tenant published on connection");
        Ok(())
    }
}
