//! Tenant reference data

use application::RequestContext;
use axum::{Extension, Json, extract::State};
use domain::Tenant;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantDto {
    pub id: i32,
    #[schema(example = "Locataire 1")]
    pub name: String,
}

impl From<Tenant> for TenantDto {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id.value(),
            name: tenant.name,
        }
    }
}

/// List all tenants
#[utoipa::path(
    get,
    path = "/tenants",
    tag = "tenants",
    responses(
        (status = 200, description = "Tenants by id", body = [TenantDto]),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<TenantDto>>, ApiError> {
    let tenants = state.tenants.list(&ctx).await?;
    Ok(Json(tenants.into_iter().map(TenantDto::from).collect()))
}
