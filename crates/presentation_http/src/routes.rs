//! Route definitions

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers,
    middleware::{JwtAuthLayer, RequestIdLayer},
    openapi,
    state::AppState,
};

/// Create the main router with all routes
///
/// Everything except health, readiness, token issuance and the API docs
/// requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_size_json_bytes;
    let cors = cors_layer(&state.config.server.allowed_origins);

    let protected = Router::new()
        .route("/tenants", get(handlers::tenants::list))
        .route(
            "/sensitive-data",
            get(handlers::sensitive_data::list).post(handlers::sensitive_data::create),
        )
        .route("/sensitive-data/grid", post(handlers::sensitive_data::grid))
        .route("/sensitive-data/search", get(handlers::sensitive_data::search))
        .route(
            "/sensitive-data/type/{type}",
            get(handlers::sensitive_data::list_by_type),
        )
        .route(
            "/sensitive-data/{id}",
            get(handlers::sensitive_data::get_by_id)
                .put(handlers::sensitive_data::update)
                .delete(handlers::sensitive_data::delete),
        )
        .layer(JwtAuthLayer::new(state.jwt.clone()));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api/token", get(handlers::token::issue_token))
        .merge(protected)
        .merge(openapi::create_openapi_routes())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(RequestIdLayer)
        .with_state(state)
}

/// Any origin when none are configured, otherwise exactly the configured ones
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
