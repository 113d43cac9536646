//! OpenAPI documentation module
//!
//! Serves the generated document at `/api-docs/openapi.json` and Swagger UI
//! at `/swagger-ui`.

// Allow clippy warnings from macro-generated code in utoipa derive
#![allow(clippy::needless_for_each)]

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{handlers, state::AppState};

/// OpenAPI documentation for the row-level security demo API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "RLS Demo API",
        version = "0.1.0",
        description = "Tenant-isolated sensitive data behind bearer tokens",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "auth", description = "Demo token issuance"),
        (name = "tenants", description = "Tenant reference data"),
        (name = "sensitive-data", description = "Tenant-scoped sensitive data")
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::token::issue_token,
        handlers::tenants::list,
        handlers::sensitive_data::list,
        handlers::sensitive_data::get_by_id,
        handlers::sensitive_data::list_by_type,
        handlers::sensitive_data::create,
        handlers::sensitive_data::update,
        handlers::sensitive_data::delete,
        handlers::sensitive_data::grid,
        handlers::sensitive_data::search,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,
            handlers::health::ReadinessResponse,
            handlers::health::DatabaseStatus,
            handlers::token::TokenResponse,
            handlers::tenants::TenantDto,
            handlers::sensitive_data::SensitiveDatumDto,
            handlers::sensitive_data::SensitiveDataPage,
            crate::error::ErrorResponse,
            // Query model (inline re-definitions for OpenAPI)
            GridCriteriaSchema,
            FilterCriteriaSchema,
            SortCriteriaSchema,
        )
    ),
    modifiers(&SecurityAddon)
)]
#[derive(Debug)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Grid request body
#[derive(Debug, utoipa::ToSchema)]
#[schema(example = json!({
    "page": 0,
    "page_size": 2,
    "filters": [{ "field_name": "Type", "predicate": "Equal", "value": "Email" }],
    "sorts": [{ "field_name": "Name", "direction": "Ascending" }]
}))]
#[allow(dead_code)]
pub struct GridCriteriaSchema {
    /// Zero-based page index
    page: Option<i64>,
    /// Paging applies only when positive
    page_size: Option<i64>,
    filters: Vec<FilterCriteriaSchema>,
    sorts: Vec<SortCriteriaSchema>,
}

/// One filter, folded left to right onto the ones before it
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct FilterCriteriaSchema {
    /// Field name or dotted path (`Tenant.Name`)
    field_name: String,
    /// `And` (default) or `Or`
    operator: Option<String>,
    /// Equal, DoesNotEqual, Contains (default), StartsWith, EndsWith,
    /// LessThan, LessThanOrEqual, GreaterThan, GreaterThanOrEqual, In
    predicate: Option<String>,
    value: Option<serde_json::Value>,
    values: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct SortCriteriaSchema {
    field_name: String,
    /// `Ascending` (default) or `Descending`
    direction: Option<String>,
}

/// Create OpenAPI documentation routes
pub fn create_openapi_routes() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
