//! Generic repository port
//!
//! Entity-agnostic CRUD, counting, existence, distinct values and paged
//! grids, parameterized by a [`QuerySpecification`] or [`Predicate`].
//!
//! Every method takes the caller's [`RequestContext`]. For entities whose
//! field registry declares a tenant scope, implementations AND
//! `tenant = ctx.tenant_id()` onto every read, update and delete, and reject
//! creates and updates of entities owned by another tenant with
//! [`ApplicationError::NotAuthorized`]. Single-operation writes commit on
//! their own; multi-step callers use [`Repository::begin`].

use async_trait::async_trait;
use domain::{
    Entity,
    query::{GridCriteria, GridPage, Literal, Predicate, QuerySpecification},
};
#[cfg(test)]
use mockall::automock;

use crate::{error::ApplicationError, request_context::RequestContext};

/// Port for tenant-scoped persistence of entity `E`
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Fetch one entity by key, `None` when absent or owned by another tenant
    async fn get_by_id(&self, ctx: &RequestContext, id: E::Key) -> Result<Option<E>, ApplicationError>;

    /// First entity matching the specification
    async fn find(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<Option<E>, ApplicationError>;

    /// Every entity matching the specification, in its sort order
    async fn get_many(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<Vec<E>, ApplicationError>;

    /// Number of matches, ignoring the paging window
    async fn count(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<u64, ApplicationError>;

    async fn exists(&self, ctx: &RequestContext, predicate: &Predicate<E>) -> Result<bool, ApplicationError>;

    /// Distinct values of `field` across the matches, in ascending order
    async fn get_distinct_values(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
        field: &str,
    ) -> Result<Vec<Literal>, ApplicationError>;

    /// Largest value of `field`, or `default` when no row is visible
    async fn max(&self, ctx: &RequestContext, field: &str, default: Literal) -> Result<Literal, ApplicationError>;

    /// One page of matches plus the total count across all pages
    async fn get_paged(&self, ctx: &RequestContext, grid: &GridCriteria) -> Result<GridPage<E>, ApplicationError>;

    /// Insert, stamping creation and last-write audit fields
    async fn create(&self, ctx: &RequestContext, entity: E) -> Result<E, ApplicationError>;

    /// Insert several entities in one commit
    async fn create_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<Vec<E>, ApplicationError>;

    /// Update by key, stamping last-write fields only; returns rows affected
    async fn update(&self, ctx: &RequestContext, entity: E) -> Result<u64, ApplicationError>;

    /// Update several entities in one commit
    async fn update_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<u64, ApplicationError>;

    /// Copy `entity`'s values onto the first row matching `spec`
    ///
    /// Returns 0 without error when nothing matches.
    async fn update_where(
        &self,
        ctx: &RequestContext,
        entity: E,
        spec: &QuerySpecification<E>,
    ) -> Result<u64, ApplicationError>;

    /// Delete by key; returns rows affected
    async fn delete(&self, ctx: &RequestContext, id: E::Key) -> Result<u64, ApplicationError>;

    /// Delete several entities in one commit
    async fn delete_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<u64, ApplicationError>;

    /// Delete every row matching `predicate`
    async fn delete_where(&self, ctx: &RequestContext, predicate: &Predicate<E>) -> Result<u64, ApplicationError>;

    /// Start an explicit transaction bound to `ctx`
    async fn begin(&self, ctx: &RequestContext) -> Result<Box<dyn RepositoryTransaction<E>>, ApplicationError>;
}

/// Explicit multi-step unit of work
///
/// Reads see earlier writes of the same transaction. Dropping it without
/// calling [`commit`](Self::commit) rolls everything back.
#[async_trait]
pub trait RepositoryTransaction<E: Entity>: Send {
    async fn get_by_id(&mut self, id: E::Key) -> Result<Option<E>, ApplicationError>;

    async fn get_many(&mut self, spec: &QuerySpecification<E>) -> Result<Vec<E>, ApplicationError>;

    async fn count(&mut self, spec: &QuerySpecification<E>) -> Result<u64, ApplicationError>;

    async fn create(&mut self, entity: E) -> Result<E, ApplicationError>;

    async fn update(&mut self, entity: E) -> Result<u64, ApplicationError>;

    async fn delete(&mut self, id: E::Key) -> Result<u64, ApplicationError>;

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError>;

    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError>;
}

#[cfg(test)]
mod tests {
    use domain::{SensitiveDatum, Tenant};

    use super::*;

    fn _assert_object_safe(_: &dyn Repository<SensitiveDatum>, _: &dyn RepositoryTransaction<Tenant>) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Repository<SensitiveDatum>>();
    }

    #[tokio::test]
    async fn mock_returns_configured_value() {
        let mut mock = MockRepository::<SensitiveDatum>::new();
        mock.expect_count().returning(|_, _| Ok(4));

        let ctx = RequestContext::system(domain::TenantId::new(1));
        let count = mock.count(&ctx, &QuerySpecification::new()).await.unwrap();
        assert_eq!(count, 4);
    }
}
