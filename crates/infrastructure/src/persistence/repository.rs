//! SQLite implementation of the generic repository port
//!
//! Every statement is scoped to the caller: for entities whose registry
//! declares a tenant field, `tenant = ctx.tenant_id()` is ANDed in front of
//! the caller's predicate on reads, updates and deletes, and writes of rows
//! owned by another tenant are refused before any SQL runs.
//!
//! Single-operation writes each run in their own transaction. The work is
//! raced against the request's cancellation token; a cancelled or dropped
//! operation never reaches `COMMIT`, so SQLite rolls it back.

use std::{fmt, future::Future, marker::PhantomData, sync::Arc};

use application::{
    error::ApplicationError,
    ports::{Repository, RepositoryTransaction},
    request_context::RequestContext,
};
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    Entity,
    query::{
        Expr, GridCriteria, GridPage, Literal, Predicate, QuerySpecification, audit_fields,
    },
    tenant::TenantFilter,
};
use futures::{
    SinkExt, StreamExt, TryStreamExt,
    channel::mpsc,
    stream::BoxStream,
};
use sqlx::{
    Sqlite, SqliteConnection, SqlitePool, Transaction,
    pool::PoolConnection,
    Row,
};
use tracing::{debug, instrument, warn};

use super::{
    AsyncDatabase,
    entity::{SqlEntity, decode_literal, key_field},
    error::map_sqlx_error,
    sql,
    tenant_session::{NoopTenantSession, TenantSession},
};

/// Rows buffered ahead of a [`SqliteRepository::stream`] consumer
const STREAM_BUFFER: usize = 64;

/// Tenant-scoped repository for entity `E`
pub struct SqliteRepository<E> {
    pool: SqlitePool,
    session: Arc<dyn TenantSession>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SqliteRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            session: Arc::clone(&self.session),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for SqliteRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRepository")
            .field("entity", &E::NAME)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<E: SqlEntity> SqliteRepository<E> {
    /// Repository over the database's pool, without storage hardening
    #[must_use]
    pub fn new(db: &AsyncDatabase) -> Self {
        Self::from_pool(db.pool().clone())
    }

    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            session: Arc::new(NoopTenantSession),
            _entity: PhantomData,
        }
    }

    /// Publish the tenant on every connection through `session`
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn TenantSession>) -> Self {
        self.session = session;
        self
    }

    async fn connection(&self, ctx: &RequestContext) -> Result<PoolConnection<Sqlite>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        self.session
            .set_current_tenant(&mut conn, ctx.tenant_id())
            .await
            .map_err(map_sqlx_error)?;
        Ok(conn)
    }

    async fn transaction(&self, ctx: &RequestContext) -> Result<Transaction<'static, Sqlite>, ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        self.session
            .set_current_tenant(&mut tx, ctx.tenant_id())
            .await
            .map_err(map_sqlx_error)?;
        Ok(tx)
    }

    /// One-shot stream of the matches, read lazily on a background task
    ///
    /// Includes are not loaded. The stream ends early with
    /// [`ApplicationError::Cancelled`] when the request is cancelled, and
    /// the reader stops once the stream is dropped.
    pub fn stream(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<BoxStream<'static, Result<E, ApplicationError>>, ApplicationError> {
        let scoped = scope_spec(ctx, spec)?;
        let statement = sql::select(
            E::fields().table(),
            scoped.criteria().map(Predicate::expr),
            &scoped.effective_order(),
            scoped.skip(),
            scoped.take(),
        );

        let (mut sender, receiver) = mpsc::channel(STREAM_BUFFER);
        let pool = self.pool.clone();
        let session = Arc::clone(&self.session);
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let produce = async {
                let mut conn = pool.acquire().await.map_err(map_sqlx_error)?;
                session
                    .set_current_tenant(&mut conn, ctx.tenant_id())
                    .await
                    .map_err(map_sqlx_error)?;

                let mut rows = statement.query().fetch(&mut *conn);
                while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
                    let item = E::from_row(&row).map_err(map_sqlx_error)?;
                    if sender.send(Ok(item)).await.is_err() {
                        break;
                    }
                }
                Ok::<(), ApplicationError>(())
            };

            let result = cancellable(&ctx, produce).await;
            if let Err(e) = result {
                let _ = sender.send(Err(e)).await;
            }
        });

        Ok(receiver.boxed())
    }
}

/// Race `work` against the request's cancellation
async fn cancellable<T>(
    ctx: &RequestContext,
    work: impl Future<Output = Result<T, ApplicationError>>,
) -> Result<T, ApplicationError> {
    tokio::select! {
        biased;
        () = ctx.cancellation().cancelled() => Err(ApplicationError::Cancelled),
        result = work => result,
    }
}

async fn commit(ctx: &RequestContext, tx: Transaction<'static, Sqlite>) -> Result<(), ApplicationError> {
    if ctx.is_cancelled() {
        warn!(request_id = %ctx.request_id(), "Request cancelled before commit, rolling back");
        return Err(ApplicationError::Cancelled);
    }
    tx.commit().await.map_err(map_sqlx_error)
}

fn scope_spec<E: Entity>(
    ctx: &RequestContext,
    spec: &QuerySpecification<E>,
) -> Result<QuerySpecification<E>, ApplicationError> {
    Ok(spec.with_tenant(ctx.tenant())?)
}

fn scope_predicate<E: Entity>(
    ctx: &RequestContext,
    predicate: Option<Predicate<E>>,
) -> Result<Option<Predicate<E>>, ApplicationError> {
    let scope = Predicate::tenant_scope(ctx.tenant_id())?;
    Ok(match (scope, predicate) {
        (Some(scope), Some(predicate)) => Some(scope.and(predicate)),
        (scope, predicate) => scope.or(predicate),
    })
}

fn key_predicate<E: Entity>(key: impl Into<Literal>) -> Result<Predicate<E>, ApplicationError> {
    Ok(Predicate::equal(E::KEY_FIELD, key)?)
}

/// Refuse writes of rows owned by another tenant
fn authorize<E: Entity>(ctx: &RequestContext, entity: &E) -> Result<(), ApplicationError> {
    if E::fields().tenant_field().is_none() {
        return Ok(());
    }
    match entity.owner() {
        Some(owner) if owner != ctx.tenant_id() => Err(ApplicationError::NotAuthorized(format!(
            "{} belongs to tenant {owner}, caller is tenant {}",
            E::NAME,
            ctx.tenant_id()
        ))),
        _ => Ok(()),
    }
}

async fn fetch_all<E: SqlEntity>(
    conn: &mut SqliteConnection,
    spec: &QuerySpecification<E>,
) -> Result<Vec<E>, ApplicationError> {
    let statement = sql::select(
        E::fields().table(),
        spec.criteria().map(Predicate::expr),
        &spec.effective_order(),
        spec.skip(),
        spec.take(),
    );
    let rows = statement
        .query()
        .fetch_all(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    let mut items = rows
        .iter()
        .map(E::from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sqlx_error)?;

    E::load_includes(conn, &mut items, spec.includes())
        .await
        .map_err(map_sqlx_error)?;
    Ok(items)
}

async fn fetch_first<E: SqlEntity>(
    conn: &mut SqliteConnection,
    spec: &QuerySpecification<E>,
) -> Result<Option<E>, ApplicationError> {
    let statement = sql::select(
        E::fields().table(),
        spec.criteria().map(Predicate::expr),
        &spec.effective_order(),
        spec.skip(),
        Some(1),
    );
    let row = statement
        .query()
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut items = [E::from_row(&row).map_err(map_sqlx_error)?];
    E::load_includes(conn, &mut items, spec.includes())
        .await
        .map_err(map_sqlx_error)?;
    let [item] = items;
    Ok(Some(item))
}

async fn count_matching<E: SqlEntity>(
    conn: &mut SqliteConnection,
    criteria: Option<&Expr>,
) -> Result<u64, ApplicationError> {
    let row = sql::count(E::fields().table(), criteria)
        .query()
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    let count: i64 = row.try_get(0).map_err(map_sqlx_error)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

async fn insert<E: SqlEntity>(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    mut entity: E,
) -> Result<E, ApplicationError> {
    authorize(ctx, &entity)?;
    if let Some(audit) = entity.audit_mut() {
        audit.stamp_created(ctx.identity(), Utc::now());
    }

    let mut values = entity.values();
    if !entity.key_is_generated() {
        values.insert(0, (key_field::<E>()?.column(), entity.identifier().into()));
    }

    let row = sql::insert(E::fields().table(), values)
        .query()
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    let created = E::from_row(&row).map_err(map_sqlx_error)?;

    debug!(entity = E::NAME, id = %created.identifier(), "Created");
    Ok(created)
}

/// Write `entity`'s values onto the row with key `key`, keeping creation provenance
async fn update_key<E: SqlEntity>(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    mut entity: E,
    key: Literal,
) -> Result<u64, ApplicationError> {
    authorize(ctx, &entity)?;
    if let Some(audit) = entity.audit_mut() {
        audit.stamp_modified(ctx.identity(), Utc::now());
    }

    let values: Vec<_> = entity
        .values()
        .into_iter()
        .filter(|(column, _)| !audit_fields::CREATION_COLUMNS.contains(column))
        .collect();
    let Some(criteria) = scope_predicate::<E>(ctx, Some(key_predicate(key)?))? else {
        return Ok(0);
    };

    let affected = sql::update(E::fields().table(), values, criteria.expr())
        .query()
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

    debug!(entity = E::NAME, affected, "Updated");
    Ok(affected)
}

async fn delete_matching<E: SqlEntity>(
    conn: &mut SqliteConnection,
    criteria: &Predicate<E>,
) -> Result<u64, ApplicationError> {
    let affected = sql::delete(E::fields().table(), criteria.expr())
        .query()
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

    debug!(entity = E::NAME, affected, "Deleted");
    Ok(affected)
}

async fn delete_key<E: SqlEntity>(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    key: E::Key,
) -> Result<u64, ApplicationError> {
    match scope_predicate::<E>(ctx, Some(key_predicate(key)?))? {
        Some(criteria) => delete_matching(conn, &criteria).await,
        None => Ok(0),
    }
}

#[async_trait]
impl<E: SqlEntity> Repository<E> for SqliteRepository<E> {
    #[instrument(skip(self, ctx), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn get_by_id(&self, ctx: &RequestContext, id: E::Key) -> Result<Option<E>, ApplicationError> {
        let spec = QuerySpecification::with_criteria(key_predicate(id)?);
        self.find(ctx, &spec).await
    }

    #[instrument(skip(self, ctx, spec), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn find(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<Option<E>, ApplicationError> {
        let scoped = scope_spec(ctx, spec)?;
        let mut conn = self.connection(ctx).await?;
        cancellable(ctx, fetch_first(&mut conn, &scoped)).await
    }

    #[instrument(skip(self, ctx, spec), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn get_many(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<Vec<E>, ApplicationError> {
        let scoped = scope_spec(ctx, spec)?;
        let mut conn = self.connection(ctx).await?;
        let items = cancellable(ctx, fetch_all(&mut conn, &scoped)).await?;
        debug!(count = items.len(), "Fetched");
        Ok(items)
    }

    #[instrument(skip(self, ctx, spec), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn count(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
    ) -> Result<u64, ApplicationError> {
        let scoped = scope_spec(ctx, spec)?;
        let mut conn = self.connection(ctx).await?;
        cancellable(
            ctx,
            count_matching::<E>(&mut conn, scoped.criteria().map(Predicate::expr)),
        )
        .await
    }

    #[instrument(skip(self, ctx, predicate), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn exists(&self, ctx: &RequestContext, predicate: &Predicate<E>) -> Result<bool, ApplicationError> {
        let scoped = scope_predicate(ctx, Some(predicate.clone()))?;
        let statement = sql::exists(E::fields().table(), scoped.as_ref().map(Predicate::expr));
        let mut conn = self.connection(ctx).await?;

        let row = cancellable(ctx, async {
            statement
                .query()
                .fetch_one(&mut *conn)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;
        let found: i64 = row.try_get(0).map_err(map_sqlx_error)?;
        Ok(found != 0)
    }

    #[instrument(skip(self, ctx, spec), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn get_distinct_values(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpecification<E>,
        field: &str,
    ) -> Result<Vec<Literal>, ApplicationError> {
        let descriptor = E::fields()
            .field(field)
            .ok_or_else(|| domain::DomainError::unknown_field(E::NAME, field))?;
        let scoped = scope_spec(ctx, spec)?;
        let statement = sql::distinct(
            E::fields().table(),
            descriptor,
            scoped.criteria().map(Predicate::expr),
        );
        let mut conn = self.connection(ctx).await?;

        let rows = cancellable(ctx, async {
            statement
                .query()
                .fetch_all(&mut *conn)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;
        rows.iter()
            .map(|row| decode_literal(row, 0, descriptor.kind()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlx_error)
    }

    #[instrument(skip(self, ctx, default), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn max(&self, ctx: &RequestContext, field: &str, default: Literal) -> Result<Literal, ApplicationError> {
        let descriptor = E::fields()
            .field(field)
            .ok_or_else(|| domain::DomainError::unknown_field(E::NAME, field))?;
        let scoped = scope_predicate::<E>(ctx, None)?;
        let statement = sql::max(
            E::fields().table(),
            descriptor,
            scoped.as_ref().map(Predicate::expr),
        );
        let mut conn = self.connection(ctx).await?;

        let row = cancellable(ctx, async {
            statement
                .query()
                .fetch_one(&mut *conn)
                .await
                .map_err(map_sqlx_error)
        })
        .await?;
        let value = decode_literal(&row, 0, descriptor.kind()).map_err(map_sqlx_error)?;
        Ok(if value.is_null() { default } else { value })
    }

    #[instrument(skip(self, ctx, grid), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn get_paged(&self, ctx: &RequestContext, grid: &GridCriteria) -> Result<GridPage<E>, ApplicationError> {
        let spec = QuerySpecification::new().apply_criteria(grid)?;
        let scoped = scope_spec(ctx, &spec)?;

        // Items and total come from the same snapshot
        let mut tx = self.transaction(ctx).await?;
        let items = cancellable(ctx, fetch_all(&mut tx, &scoped)).await?;
        let total_count = cancellable(
            ctx,
            count_matching::<E>(&mut tx, scoped.criteria().map(Predicate::expr)),
        )
        .await?;
        commit(ctx, tx).await?;

        debug!(items = items.len(), total_count, "Fetched page");
        Ok(GridPage {
            items,
            page: grid.page.unwrap_or_default(),
            page_size: grid.page_size.unwrap_or_default(),
            total_count,
        })
    }

    #[instrument(skip(self, ctx, entity), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn create(&self, ctx: &RequestContext, entity: E) -> Result<E, ApplicationError> {
        authorize(ctx, &entity)?;
        let mut tx = self.transaction(ctx).await?;
        let created = cancellable(ctx, insert(&mut tx, ctx, entity)).await?;
        commit(ctx, tx).await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx, entities), fields(entity = E::NAME, tenant_id = %ctx.tenant_id(), count = entities.len()))]
    async fn create_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<Vec<E>, ApplicationError> {
        entities.iter().try_for_each(|entity| authorize(ctx, entity))?;
        let mut tx = self.transaction(ctx).await?;
        let created = cancellable(ctx, async {
            let mut created = Vec::with_capacity(entities.len());
            for entity in entities {
                created.push(insert(&mut tx, ctx, entity).await?);
            }
            Ok(created)
        })
        .await?;
        commit(ctx, tx).await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx, entity), fields(entity = E::NAME, tenant_id = %ctx.tenant_id(), id = %entity.identifier()))]
    async fn update(&self, ctx: &RequestContext, entity: E) -> Result<u64, ApplicationError> {
        authorize(ctx, &entity)?;
        let key = entity.identifier().into();
        let mut tx = self.transaction(ctx).await?;
        let affected = cancellable(ctx, update_key(&mut tx, ctx, entity, key)).await?;
        commit(ctx, tx).await?;
        Ok(affected)
    }

    #[instrument(skip(self, ctx, entities), fields(entity = E::NAME, tenant_id = %ctx.tenant_id(), count = entities.len()))]
    async fn update_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<u64, ApplicationError> {
        entities.iter().try_for_each(|entity| authorize(ctx, entity))?;
        let mut tx = self.transaction(ctx).await?;
        let affected = cancellable(ctx, async {
            let mut affected = 0;
            for entity in entities {
                let key = entity.identifier().into();
                affected += update_key(&mut tx, ctx, entity, key).await?;
            }
            Ok(affected)
        })
        .await?;
        commit(ctx, tx).await?;
        Ok(affected)
    }

    #[instrument(skip(self, ctx, entity, spec), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn update_where(
        &self,
        ctx: &RequestContext,
        entity: E,
        spec: &QuerySpecification<E>,
    ) -> Result<u64, ApplicationError> {
        authorize(ctx, &entity)?;
        let scoped = scope_spec(ctx, spec)?;
        let key = key_field::<E>()?;
        let statement = sql::select_first_key(
            E::fields().table(),
            key,
            scoped.criteria().map(Predicate::expr),
            &scoped.effective_order(),
        );

        let mut tx = self.transaction(ctx).await?;
        let affected = cancellable(ctx, async {
            let row = statement
                .query()
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            let Some(row) = row else {
                debug!("No row matched, nothing updated");
                return Ok(0);
            };
            let found = decode_literal(&row, 0, key.kind()).map_err(map_sqlx_error)?;
            update_key(&mut tx, ctx, entity, found).await
        })
        .await?;
        commit(ctx, tx).await?;
        Ok(affected)
    }

    #[instrument(skip(self, ctx), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn delete(&self, ctx: &RequestContext, id: E::Key) -> Result<u64, ApplicationError> {
        let mut tx = self.transaction(ctx).await?;
        let affected = cancellable(ctx, delete_key::<E>(&mut tx, ctx, id)).await?;
        commit(ctx, tx).await?;
        Ok(affected)
    }

    #[instrument(skip(self, ctx, entities), fields(entity = E::NAME, tenant_id = %ctx.tenant_id(), count = entities.len()))]
    async fn delete_many(&self, ctx: &RequestContext, entities: Vec<E>) -> Result<u64, ApplicationError> {
        let mut tx = self.transaction(ctx).await?;
        let affected = cancellable(ctx, async {
            let mut affected = 0;
            for entity in &entities {
                affected += delete_key::<E>(&mut tx, ctx, entity.identifier()).await?;
            }
            Ok(affected)
        })
        .await?;
        commit(ctx, tx).await?;
        Ok(affected)
    }

    #[instrument(skip(self, ctx, predicate), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn delete_where(&self, ctx: &RequestContext, predicate: &Predicate<E>) -> Result<u64, ApplicationError> {
        let Some(criteria) = scope_predicate(ctx, Some(predicate.clone()))? else {
            return Ok(0);
        };
        let mut tx = self.transaction(ctx).await?;
        let affected = cancellable(ctx, delete_matching(&mut tx, &criteria)).await?;
        commit(ctx, tx).await?;
        Ok(affected)
    }

    #[instrument(skip(self, ctx), fields(entity = E::NAME, tenant_id = %ctx.tenant_id()))]
    async fn begin(&self, ctx: &RequestContext) -> Result<Box<dyn RepositoryTransaction<E>>, ApplicationError> {
        let tx = self.transaction(ctx).await?;
        Ok(Box::new(SqliteRepositoryTransaction {
            tx,
            ctx: ctx.clone(),
            _entity: PhantomData,
        }))
    }
}

/// Explicit transaction opened by [`SqliteRepository::begin`]
pub struct SqliteRepositoryTransaction<E> {
    tx: Transaction<'static, Sqlite>,
    ctx: RequestContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> fmt::Debug for SqliteRepositoryTransaction<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRepositoryTransaction")
            .field("entity", &E::NAME)
            .field("request_id", &self.ctx.request_id())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: SqlEntity> RepositoryTransaction<E> for SqliteRepositoryTransaction<E> {
    async fn get_by_id(&mut self, id: E::Key) -> Result<Option<E>, ApplicationError> {
        let spec = scope_spec(&self.ctx, &QuerySpecification::with_criteria(key_predicate(id)?))?;
        cancellable(&self.ctx, fetch_first(&mut self.tx, &spec)).await
    }

    async fn get_many(&mut self, spec: &QuerySpecification<E>) -> Result<Vec<E>, ApplicationError> {
        let scoped = scope_spec(&self.ctx, spec)?;
        cancellable(&self.ctx, fetch_all(&mut self.tx, &scoped)).await
    }

    async fn count(&mut self, spec: &QuerySpecification<E>) -> Result<u64, ApplicationError> {
        let scoped = scope_spec(&self.ctx, spec)?;
        cancellable(
            &self.ctx,
            count_matching::<E>(&mut self.tx, scoped.criteria().map(Predicate::expr)),
        )
        .await
    }

    async fn create(&mut self, entity: E) -> Result<E, ApplicationError> {
        cancellable(&self.ctx, insert(&mut self.tx, &self.ctx, entity)).await
    }

    async fn update(&mut self, entity: E) -> Result<u64, ApplicationError> {
        let key = entity.identifier().into();
        cancellable(&self.ctx, update_key(&mut self.tx, &self.ctx, entity, key)).await
    }

    async fn delete(&mut self, id: E::Key) -> Result<u64, ApplicationError> {
        cancellable(&self.ctx, delete_key::<E>(&mut self.tx, &self.ctx, id)).await
    }

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
        let Self { tx, ctx, .. } = *self;
        commit(&ctx, tx).await?;
        debug!(entity = E::NAME, request_id = %ctx.request_id(), "Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        debug!(entity = E::NAME, "Transaction rolled back");
        Ok(())
    }
}
