//! Demo credential issuance
//!
//! Hands out signed bearer tokens without checking any password. The role
//! is derived from the requested name so both roles can be tried quickly.

use application::RequestContext;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use domain::TenantId;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{ApiError, ErrorResponse},
    middleware::ADMINISTRATOR_ROLE,
    state::AppState,
};

/// Role of every login that does not mention `admin`
pub const CONTRIBUTOR_ROLE: &str = "Contributor";

/// Tenant used when the request names none
const DEFAULT_TENANT: i32 = 1;

#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    /// Login suffix; a name containing `admin` gets the administrator role
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    /// Tenant id; defaults to 1
    pub tenant: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    #[schema(example = "Jean-Michel ADMIN")]
    pub login: String,
    pub expires_on: DateTime<Utc>,
    pub roles: Vec<String>,
    pub tenant_id: i32,
}

/// `Jean-Michel {NAME}` with the name upper-cased
fn login_for(name: &str) -> String {
    format!("Jean-Michel {}", name.trim().to_uppercase())
}

fn roles_for(login: &str) -> Vec<String> {
    let role = if login.to_lowercase().contains("admin") {
        ADMINISTRATOR_ROLE
    } else {
        CONTRIBUTOR_ROLE
    };
    vec![role.to_string()]
}

/// Issue a bearer token for a demo login
#[utoipa::path(
    get,
    path = "/api/token",
    tag = "auth",
    params(TokenQuery),
    responses(
        (status = 200, description = "Signed token", body = TokenResponse),
        (status = 400, description = "Blank name or unknown tenant", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn issue_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, ApiError> {
    if query.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name: must not be blank".into()));
    }
    query
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let tenant_id = TenantId::new(query.tenant.unwrap_or(DEFAULT_TENANT));
    let lookup = RequestContext::system(tenant_id);
    if !state.tenants.exists(&lookup, tenant_id).await? {
        return Err(ApiError::BadRequest(format!("Unknown tenant {tenant_id}")));
    }

    let login = login_for(&query.name);
    let roles = roles_for(&login);
    let issued = state
        .jwt
        .issue(&login, roles.clone(), tenant_id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(login = %login, tenant_id = %tenant_id, "Token issued");
    Ok(Json(TokenResponse {
        token: issued.token,
        login,
        expires_on: issued.expires_on,
        roles,
        tenant_id: tenant_id.value(),
    }))
}
