//! Sensitive data handlers
//!
//! Every handler reads the caller's [`RequestContext`] set by the auth
//! layer; writes additionally require the administrator role.

use application::{ApplicationError, RequestContext, SearchQuery};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use domain::{
    SensitiveDatum, SensitiveDatumType, TenantId,
    query::{GridCriteria, GridPage},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{ApiError, ErrorResponse},
    middleware::{RequireAdministrator, ValidatedJson},
    state::AppState,
};

/// Sensitive datum as exchanged over HTTP
///
/// Audit fields and the tenant name are read-only; values sent for them are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SensitiveDatumDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "Email")]
    pub datum_type: SensitiveDatumType,
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    #[schema(example = "Email du locataire 1")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Owning tenant; the caller's tenant when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(read_only)]
    pub tenant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(read_only)]
    pub track_creation_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(read_only)]
    pub track_creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(read_only)]
    pub track_last_write_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(read_only)]
    pub track_last_write_time: Option<DateTime<Utc>>,
}

impl SensitiveDatumDto {
    /// Entity for a write by `ctx`
    fn into_entity(self, ctx: &RequestContext) -> SensitiveDatum {
        let tenant_id = self.tenant_id.map_or_else(|| ctx.tenant_id(), TenantId::new);
        let mut datum = SensitiveDatum::new(self.datum_type, self.name, tenant_id)
            .with_identifier(self.id.unwrap_or_default());
        datum.content = self.content;
        datum
    }
}

impl From<SensitiveDatum> for SensitiveDatumDto {
    fn from(datum: SensitiveDatum) -> Self {
        Self {
            id: Some(datum.identifier),
            datum_type: datum.datum_type,
            name: datum.name,
            content: datum.content,
            tenant_id: Some(datum.tenant_id.value()),
            tenant_name: datum.tenant.map(|t| t.name),
            track_creation_user: Some(datum.audit.track_creation_user),
            track_creation_time: Some(datum.audit.track_creation_time),
            track_last_write_user: Some(datum.audit.track_last_write_user),
            track_last_write_time: Some(datum.audit.track_last_write_time),
        }
    }
}

/// One page of sensitive data
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SensitiveDataPage {
    pub items: Vec<SensitiveDatumDto>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: u64,
    pub page_count: u64,
}

impl From<GridPage<SensitiveDatum>> for SensitiveDataPage {
    fn from(page: GridPage<SensitiveDatum>) -> Self {
        let page_count = page.page_count();
        let page = page.map(SensitiveDatumDto::from);
        Self {
            items: page.items,
            page: page.page,
            page_size: page.page_size,
            total_count: page.total_count,
            page_count,
        }
    }
}

/// Registry-driven search parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Term matched against every searchable field
    pub search: Option<String>,
    /// Sort alias or group (`name`, `default`, ...)
    pub sort: Option<String>,
    #[serde(default)]
    pub desc: bool,
    /// Zero-based page index
    #[serde(default)]
    pub page: i64,
    /// Page size; 0 returns every match
    #[serde(default)]
    pub page_size: i64,
    /// Category filter (`Email`, `BankAccount`, ...)
    #[serde(rename = "type")]
    pub datum_type: Option<String>,
    /// Name fragment
    pub name: Option<String>,
}

impl From<SearchParams> for SearchQuery {
    fn from(params: SearchParams) -> Self {
        let filters = [("type", params.datum_type), ("name", params.name)]
            .into_iter()
            .filter_map(|(alias, value)| {
                value
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (alias.to_string(), vec![Value::String(v)]))
            })
            .collect();

        Self {
            search: params.search,
            sort: params.sort,
            descending: params.desc,
            page: params.page,
            page_size: params.page_size,
            filters,
        }
    }
}

fn to_dtos(data: Vec<SensitiveDatum>) -> Json<Vec<SensitiveDatumDto>> {
    Json(data.into_iter().map(SensitiveDatumDto::from).collect())
}

/// List the caller's data, sorted by name
#[utoipa::path(
    get,
    path = "/sensitive-data",
    tag = "sensitive-data",
    responses(
        (status = 200, description = "Data of the caller's tenant", body = [SensitiveDatumDto]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, fields(tenant_id = %ctx.tenant_id()))]
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<SensitiveDatumDto>>, ApiError> {
    Ok(to_dtos(state.sensitive_data.list(&ctx).await?))
}

/// Fetch one datum
#[utoipa::path(
    get,
    path = "/sensitive-data/{id}",
    tag = "sensitive-data",
    params(("id" = i32, Path, description = "Datum identifier")),
    responses(
        (status = 200, description = "Datum", body = SensitiveDatumDto),
        (status = 404, description = "Absent or owned by another tenant", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant_id()))]
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
) -> Result<Json<SensitiveDatumDto>, ApiError> {
    let datum = state.sensitive_data.get(&ctx, id).await?;
    Ok(Json(datum.into()))
}

/// List the caller's data of one category
#[utoipa::path(
    get,
    path = "/sensitive-data/type/{type}",
    tag = "sensitive-data",
    params(("type" = String, Path, description = "Name, Email, SocialSecurityNumber or BankAccount")),
    responses(
        (status = 200, description = "Data of that category", body = [SensitiveDatumDto]),
        (status = 400, description = "Unknown category", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant_id()))]
pub async fn list_by_type(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(datum_type): Path<String>,
) -> Result<Json<Vec<SensitiveDatumDto>>, ApiError> {
    let datum_type: SensitiveDatumType = datum_type.parse().map_err(ApplicationError::from)?;
    Ok(to_dtos(state.sensitive_data.list_by_type(&ctx, datum_type).await?))
}

/// Create a datum in the caller's tenant
#[utoipa::path(
    post,
    path = "/sensitive-data",
    tag = "sensitive-data",
    request_body = SensitiveDatumDto,
    responses(
        (status = 201, description = "Created", body = SensitiveDatumDto),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 401, description = "Payload names another tenant", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, fields(tenant_id = %ctx.tenant_id()))]
pub async fn create(
    _admin: RequireAdministrator,
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(dto): ValidatedJson<SensitiveDatumDto>,
) -> Result<(StatusCode, Json<SensitiveDatumDto>), ApiError> {
    let datum = dto.into_entity(&ctx).with_identifier(0);
    let created = state.sensitive_data.create(&ctx, datum).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Replace a datum's values
#[utoipa::path(
    put,
    path = "/sensitive-data/{id}",
    tag = "sensitive-data",
    params(("id" = i32, Path, description = "Datum identifier")),
    request_body = SensitiveDatumDto,
    responses(
        (status = 200, description = "Updated", body = SensitiveDatumDto),
        (status = 400, description = "Body id differs from route id", body = ErrorResponse),
        (status = 401, description = "Payload names another tenant", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "No row of the caller's tenant updated", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(_admin, state, ctx, dto), fields(tenant_id = %ctx.tenant_id()))]
pub async fn update(
    _admin: RequireAdministrator,
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
    ValidatedJson(dto): ValidatedJson<SensitiveDatumDto>,
) -> Result<Json<SensitiveDatumDto>, ApiError> {
    let updated = state
        .sensitive_data
        .update(&ctx, id, dto.into_entity(&ctx))
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a datum
#[utoipa::path(
    delete,
    path = "/sensitive-data/{id}",
    tag = "sensitive-data",
    params(("id" = i32, Path, description = "Datum identifier")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "No row of the caller's tenant removed", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(_admin, state, ctx), fields(tenant_id = %ctx.tenant_id()))]
pub async fn delete(
    _admin: RequireAdministrator,
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.sensitive_data.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// One page from declarative grid criteria
#[utoipa::path(
    post,
    path = "/sensitive-data/grid",
    tag = "sensitive-data",
    request_body = crate::openapi::GridCriteriaSchema,
    responses(
        (status = 200, description = "Page and total count", body = SensitiveDataPage),
        (status = 400, description = "Unknown field, unsupported predicate or negative paging", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, fields(tenant_id = %ctx.tenant_id()))]
pub async fn grid(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(criteria): Json<GridCriteria>,
) -> Result<Json<SensitiveDataPage>, ApiError> {
    let page = state.sensitive_data.grid(&ctx, &criteria).await?;
    Ok(Json(page.into()))
}

/// One page from a search term, alias filters and alias sort
#[utoipa::path(
    get,
    path = "/sensitive-data/search",
    tag = "sensitive-data",
    params(SearchParams),
    responses(
        (status = 200, description = "Page and total count", body = SensitiveDataPage),
        (status = 400, description = "Invalid filter value or paging", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[instrument(skip(state, ctx), fields(tenant_id = %ctx.tenant_id()))]
pub async fn search(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SensitiveDataPage>, ApiError> {
    let page = state.sensitive_data.search(&ctx, &params.into()).await?;
    Ok(Json(page.into()))
}
