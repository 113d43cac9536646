//! Blocking calling convention for the repository port
//!
//! [`BlockingRepository`] drives any async [`Repository`] on a runtime it
//! owns, so synchronous callers get the same operations with the same
//! semantics. Calls must not be made from inside another Tokio runtime.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use application::{BlockingRepository, Repository, RequestContext};
//! use domain::{SensitiveDatum, TenantId};
//!
//! fn count(repository: Arc<dyn Repository<SensitiveDatum>>) -> u64 {
//!     let blocking = BlockingRepository::new(repository).unwrap();
//!     let ctx = RequestContext::system(TenantId::new(1));
//!     blocking.count(&ctx, &Default::default()).unwrap()
//! }
//! ```

use std::{fmt, sync::Arc};

use domain::{
    Entity,
    query::{GridCriteria, GridPage, Literal, Predicate, QuerySpecification},
};
use tokio::runtime::{Builder, Runtime};

use crate::{
    error::ApplicationError,
    ports::{Repository, RepositoryTransaction},
    request_context::RequestContext,
};

/// Synchronous facade over an async repository
pub struct BlockingRepository<E: Entity> {
    inner: Arc<dyn Repository<E>>,
    runtime: Runtime,
}

impl<E: Entity> fmt::Debug for BlockingRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingRepository")
            .field("entity", &E::NAME)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> BlockingRepository<E> {
    /// Wrap `inner` with a dedicated current-thread runtime
    pub fn new(inner: Arc<dyn Repository<E>>) -> Result<Self, ApplicationError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ApplicationError::Internal(format!("Failed to build runtime: {e}")))?;
        Ok(Self::with_runtime(inner, runtime))
    }

    /// Wrap `inner` with a caller-provided runtime
    pub fn with_runtime(inner: Arc<dyn Repository<E>>, runtime: Runtime) -> Self {
        Self { inner, runtime }
    }

    pub fn get_by_id(&self, ctx: &RequestContext, id: E::Key) -> Result<Option<E>, ApplicationError> {
        self.runtime.block_on(self.inner.get_by_id(ctx, id))
    }

    pub fn find(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<Option<E>, ApplicationError> {
        self.runtime.block_on(self.inner.find(ctx, spec))
    }

    pub fn get_many(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<Vec<E>, ApplicationError> {
        self.runtime.block_on(self.inner.get_many(ctx, spec))
    }

    pub fn count(&self, ctx: &RequestContext, spec: &QuerySpecification<E>) -> Result<u64, ApplicationError> {
        self.runtime.block_on(self.inner.count(ctx, spec))
    }

    pub fn exists(&self, ctx: &RequestContext, predicate: &Predicate<E>) -> Result<bool, ApplicationError> {
        self.runtime.block_on(self.inner.exists(ctx, predicate))
    }

    pub fn get_distinct_values(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
        field: &str,
    ) -> Result<Vec<Literal>, ApplicationError> {
        self.runtime
            .block_on(self.inner.get_distinct_values(ctx, spec, field))
    }

    pub fn max(&self, ctx: &RequestContext, field: &str, default: Literal) -> Result<Literal, ApplicationError> {
        self.runtime.block_on(self.inner.max(ctx, field, default))
    }

    pub fn get_paged(&self, ctx: &RequestContext, grid: &GridCriteria) -> Result<GridPage<E>, ApplicationError> {
        self.runtime.block_on(self.inner.get_paged(ctx, grid))
    }

    pub fn create(&self, ctx: &RequestContext, entity: E) -> Result<E, ApplicationError> {
        self.runtime.block_on(self.inner.create(ctx, entity))
    }

    pub fn create_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<Vec<E>, ApplicationError> {
        self.runtime.block_on(self.inner.create_many(ctx, entities))
    }

    pub fn update(&self, ctx: &RequestContext, entity: E) -> Result<u64, ApplicationError> {
        self.runtime.block_on(self.inner.update(ctx, entity))
    }

    pub fn update_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<u64, ApplicationError> {
        self.runtime.block_on(self.inner.update_many(ctx, entities))
    }

    pub fn update_where(
        &self,
        ctx: &RequestContext,
        entity: E,
        spec: &QuerySpecification<E>,
    ) -> Result<u64, ApplicationError> {
        self.runtime
            .block_on(self.inner.update_where(ctx, entity, spec))
    }

    pub fn delete(&self, ctx: &RequestContext, id: E::Key) -> Result<u64, ApplicationError> {
        self.runtime.block_on(self.inner.delete(ctx, id))
    }

    pub fn delete_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<u64, ApplicationError> {
        self.runtime.block_on(self.inner.delete_many(ctx, entities))
    }

    pub fn delete_where(&self, ctx: &RequestContext, predicate: &Predicate<E>) -> Result<u64, ApplicationError> {
        self.runtime.block_on(self.inner.delete_where(ctx, predicate))
    }

    /// Run a multi-step unit of work to completion
    ///
    /// The closure receives the open transaction and returns the future to
    /// drive; commit or roll back inside it.
    pub fn transaction<T, F>(&self, ctx: &RequestContext, work: F) -> Result<T, ApplicationError>
    where
        F: AsyncFnOnce(Box<dyn RepositoryTransaction<E>>) -> Result<T, ApplicationError>,
    {
        self.runtime.block_on(async {
            let tx = self.inner.begin(ctx).await?;
            work(tx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use domain::{SensitiveDatum, SensitiveDatumType, TenantId};

    use super::*;
    use crate::ports::MockRepository;

    fn ctx() -> RequestContext {
        RequestContext::system(TenantId::new(1))
    }

    #[test]
    fn blocking_calls_reach_inner_repository() {
        let mut mock = MockRepository::<SensitiveDatum>::new();
        mock.expect_count().returning(|_, _| Ok(12));
        mock.expect_get_by_id().returning(|_, _| Ok(None));
        let blocking = BlockingRepository::new(Arc::new(mock)).unwrap();

        assert_eq!(blocking.count(&ctx(), &QuerySpecification::new()).unwrap(), 12);
        assert!(blocking.get_by_id(&ctx(), 5).unwrap().is_none());
    }

    #[test]
    fn blocking_errors_are_unchanged() {
        let mut mock = MockRepository::<SensitiveDatum>::new();
        mock.expect_create()
            .returning(|_, _| Err(ApplicationError::NotAuthorized("tenant".into())));
        let blocking = BlockingRepository::new(Arc::new(mock)).unwrap();

        let datum = SensitiveDatum::new(SensitiveDatumType::Name, "Nom", TenantId::new(2));
        assert!(matches!(
            blocking.create(&ctx(), datum),
            Err(ApplicationError::NotAuthorized(_))
        ));
    }

    #[test]
    fn max_returns_inner_default() {
        let mut mock = MockRepository::<SensitiveDatum>::new();
        mock.expect_max().returning(|_, _, default| Ok(default));
        let blocking = BlockingRepository::new(Arc::new(mock)).unwrap();

        assert_eq!(
            blocking.max(&ctx(), "Identifier", Literal::Integer(0)).unwrap(),
            Literal::Integer(0)
        );
    }
}
