//! Tenant Service - Read access to tenant reference data

use std::sync::Arc;

use domain::{Entity, Tenant, TenantId, query::QuerySpecification};
use tracing::instrument;

use crate::{error::ApplicationError, ports::Repository, request_context::RequestContext};

/// Service for looking up tenants
pub struct TenantService {
    repository: Arc<dyn Repository<Tenant>>,
}

impl std::fmt::Debug for TenantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantService").finish_non_exhaustive()
    }
}

impl TenantService {
    /// Create a new tenant service
    pub fn new(repository: Arc<dyn Repository<Tenant>>) -> Self {
        Self { repository }
    }

    /// All tenants, by id
    #[instrument(skip(self, ctx))]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Tenant>, ApplicationError> {
        let spec = QuerySpecification::new().apply_order_by(Tenant::KEY_FIELD)?;
        self.repository.get_many(ctx, &spec).await
    }

    /// One tenant; `NotFound` when unknown
    #[instrument(skip(self, ctx))]
    pub async fn get(&self, ctx: &RequestContext, id: TenantId) -> Result<Tenant, ApplicationError> {
        self.repository
            .get_by_id(ctx, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(Tenant::NAME, id))
    }

    /// Whether a tenant with this id exists
    #[instrument(skip(self, ctx))]
    pub async fn exists(&self, ctx: &RequestContext, id: TenantId) -> Result<bool, ApplicationError> {
        Ok(self.repository.get_by_id(ctx, id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockRepository;

    fn ctx() -> RequestContext {
        RequestContext::system(TenantId::new(1))
    }

    #[tokio::test]
    async fn list_orders_by_id() {
        let mut mock = MockRepository::<Tenant>::new();
        mock.expect_get_many()
            .withf(|_, spec| spec.order_by().first().map(|k| k.field.path()) == Some("Id"))
            .returning(|_, _| Ok(vec![Tenant::new(TenantId::new(1), "Locataire 1")]));

        let tenants = TenantService::new(Arc::new(mock)).list(&ctx()).await.unwrap();
        assert_eq!(tenants.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let mut mock = MockRepository::<Tenant>::new();
        mock.expect_get_by_id().returning(|_, _| Ok(None));
        let service = TenantService::new(Arc::new(mock));

        assert!(matches!(
            service.get(&ctx(), TenantId::new(9)).await,
            Err(ApplicationError::NotFound(_))
        ));
        assert!(!service.exists(&ctx(), TenantId::new(9)).await.unwrap());
    }
}
