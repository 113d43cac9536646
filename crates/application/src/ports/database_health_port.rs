//! Readiness port for the tenant data store

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Snapshot reported by `GET /ready`
#[derive(Debug, Clone, Default)]
pub struct DatabaseHealth {
    pub reachable: bool,
    /// Engine and version, e.g. `SQLite 3.45.1`
    pub version: Option<String>,
    /// Open pool connections
    pub pool_size: Option<u32>,
    pub response_time_ms: Option<u64>,
}

impl DatabaseHealth {
    /// Store answered; `version` identifies the engine
    #[must_use]
    pub fn reachable(version: impl Into<String>) -> Self {
        Self {
            reachable: true,
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// Store did not answer
    #[must_use]
    pub fn unhealthy() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_response_time(mut self, ms: u64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    #[must_use]
    pub const fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }
}

/// Connectivity checks against the store holding tenant data
///
/// Implementations never touch tenant rows, so no `RequestContext` is needed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabaseHealthPort: Send + Sync {
    /// Cheap round trip (`SELECT 1`)
    async fn is_available(&self) -> bool;

    /// Version, pool state and latency; `Persistence` when the store is down
    async fn check_health(&self) -> Result<DatabaseHealth, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_carries_version_only() {
        let health = DatabaseHealth::reachable("SQLite 3.45.1");
        assert!(health.reachable);
        assert_eq!(health.version.as_deref(), Some("SQLite 3.45.1"));
        assert!(health.pool_size.is_none());
    }

    #[test]
    fn unhealthy_reports_nothing() {
        let health = DatabaseHealth::unhealthy();
        assert!(!health.reachable);
        assert!(health.version.is_none());
        assert!(health.response_time_ms.is_none());
    }

    #[test]
    fn builders_fill_pool_and_latency() {
        let health = DatabaseHealth::reachable("SQLite")
            .with_pool_size(1)
            .with_response_time(3);
        assert_eq!(health.pool_size, Some(1));
        assert_eq!(health.response_time_ms, Some(3));
    }

    #[tokio::test]
    async fn mock_reports_outage() {
        let mut port = MockDatabaseHealthPort::new();
        port.expect_is_available().return_const(false);
        port.expect_check_health()
            .returning(|| Err(ApplicationError::Persistence("down".into())));

        assert!(!port.is_available().await);
        assert!(port.check_health().await.is_err());
    }
}
