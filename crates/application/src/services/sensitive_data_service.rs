//! Sensitive Data Service - Tenant-scoped use cases over sensitive data

use std::sync::Arc;

use domain::{
    Entity, SensitiveDatum, SensitiveDatumRelation, SensitiveDatumType,
    query::{GridCriteria, GridPage, Predicate, QuerySpecification},
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{error::ApplicationError, ports::Repository, request_context::RequestContext};

/// Registry-driven search request (global search, alias filters, alias sort)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub descending: bool,
    pub page: i64,
    pub page_size: i64,
    /// `(alias, values)` pairs, e.g. `("type", ["Email"])`
    pub filters: Vec<(String, Vec<Value>)>,
}

/// Service for listing and maintaining sensitive data of the caller's tenant
pub struct SensitiveDataService {
    repository: Arc<dyn Repository<SensitiveDatum>>,
}

impl std::fmt::Debug for SensitiveDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensitiveDataService").finish_non_exhaustive()
    }
}

impl SensitiveDataService {
    /// Create a new sensitive data service
    pub fn new(repository: Arc<dyn Repository<SensitiveDatum>>) -> Self {
        Self { repository }
    }

    /// Every datum of the caller's tenant, by name, with its tenant loaded
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<SensitiveDatum>, ApplicationError> {
        let spec = QuerySpecification::new()
            .add_include(SensitiveDatumRelation::Tenant)
            .apply_order_by("Name")?;
        self.repository.get_many(ctx, &spec).await
    }

    /// Data of one category, by name
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn list_by_type(
        &self,
        ctx: &RequestContext,
        datum_type: SensitiveDatumType,
    ) -> Result<Vec<SensitiveDatum>, ApplicationError> {
        let spec = QuerySpecification::with_criteria(Predicate::equal("Type", datum_type)?)
            .add_include(SensitiveDatumRelation::Tenant)
            .apply_order_by("Name")?;
        self.repository.get_many(ctx, &spec).await
    }

    /// One datum; `NotFound` when absent or owned by another tenant
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn get(&self, ctx: &RequestContext, id: i32) -> Result<SensitiveDatum, ApplicationError> {
        self.repository
            .get_by_id(ctx, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(SensitiveDatum::NAME, id))
    }

    /// Create a datum in the caller's tenant
    ///
    /// A payload naming another tenant is rejected before storage is touched.
    #[instrument(skip(self, ctx, datum), fields(tenant_id = %ctx.tenant_id(), name = %datum.name))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        datum: SensitiveDatum,
    ) -> Result<SensitiveDatum, ApplicationError> {
        Self::ensure_same_tenant(ctx, &datum)?;

        let created = self.repository.create(ctx, datum).await?;
        info!(id = created.identifier, "Sensitive datum created");
        Ok(created)
    }

    /// Replace a datum's values
    ///
    /// Fails with `Validation` when `id` and the payload disagree,
    /// `NotAuthorized` on a tenant mismatch and `NotFound` when no row of the
    /// caller's tenant was updated.
    #[instrument(skip(self, ctx, datum), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        mut datum: SensitiveDatum,
    ) -> Result<SensitiveDatum, ApplicationError> {
        if datum.identifier == 0 {
            datum.identifier = id;
        } else if datum.identifier != id {
            return Err(ApplicationError::Validation(format!(
                "route id {id} does not match body id {}",
                datum.identifier
            )));
        }
        Self::ensure_same_tenant(ctx, &datum)?;

        let affected = self.repository.update(ctx, datum).await?;
        if affected == 0 {
            return Err(ApplicationError::not_found(SensitiveDatum::NAME, id));
        }
        debug!(affected, "Sensitive datum updated");
        self.get(ctx, id).await
    }

    /// Delete a datum; `NotFound` when nothing was removed
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<(), ApplicationError> {
        let predicate = Predicate::equal(SensitiveDatum::KEY_FIELD, id)?;
        let affected = self.repository.delete_where(ctx, &predicate).await?;
        if affected == 0 {
            return Err(ApplicationError::not_found(SensitiveDatum::NAME, id));
        }
        info!(id, "Sensitive datum deleted");
        Ok(())
    }

    /// One grid page from declarative criteria
    #[instrument(skip(self, ctx, grid), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn grid(
        &self,
        ctx: &RequestContext,
        grid: &GridCriteria,
    ) -> Result<GridPage<SensitiveDatum>, ApplicationError> {
        self.repository.get_paged(ctx, grid).await
    }

    /// One grid page from a global search term, alias filters and alias sort
    ///
    /// The page and the total are read in one transaction.
    #[instrument(skip(self, ctx, query), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn search(
        &self,
        ctx: &RequestContext,
        query: &SearchQuery,
    ) -> Result<GridPage<SensitiveDatum>, ApplicationError> {
        let spec = QuerySpecification::new()
            .add_include(SensitiveDatumRelation::Tenant)
            .apply_search_criteria(
                &query.filters,
                query.search.as_deref(),
                query.sort.as_deref(),
                query.descending,
                query.page,
                query.page_size,
            )?;

        let mut tx = self.repository.begin(ctx).await?;
        let items = tx.get_many(&spec).await?;
        let total_count = tx.count(&spec.without_paging()).await?;
        tx.commit().await?;

        Ok(GridPage {
            items,
            page: query.page,
            page_size: query.page_size,
            total_count,
        })
    }

    fn ensure_same_tenant(ctx: &RequestContext, datum: &SensitiveDatum) -> Result<(), ApplicationError> {
        if datum.tenant_id == ctx.tenant_id() {
            return Ok(());
        }
        warn!(
            caller_tenant = %ctx.tenant_id(),
            payload_tenant = %datum.tenant_id,
            "Tenant mismatch in sensitive datum payload"
        );
        Err(ApplicationError::NotAuthorized(format!(
            "tenant {} does not match the caller's tenant",
            datum.tenant_id
        )))
    }
}
