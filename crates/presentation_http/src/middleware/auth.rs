//! Bearer token authentication
//!
//! Verifies the JWT in the `Authorization` header and turns its claims into
//! the [`RequestContext`] every handler passes to the services. A token
//! without a usable tenant claim is rejected before any handler runs.
//!
//! The context's cancellation token fires when the request future is
//! dropped, so an abandoned request rolls back its open transaction.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use application::RequestContext;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use domain::tenant::TenantContext;
use infrastructure::{Claims, JwtService};
use tower::{Layer, Service};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::{RequestId, RequestSpan},
};

/// Role required by write endpoints
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// Layer that authenticates requests with bearer tokens
#[derive(Clone, Debug)]
pub struct JwtAuthLayer {
    jwt: Arc<JwtService>,
}

impl JwtAuthLayer {
    #[must_use]
    pub const fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

impl<S> Layer<S> for JwtAuthLayer {
    type Service = JwtAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtAuth {
            inner,
            jwt: Arc::clone(&self.jwt),
        }
    }
}

/// Middleware service for bearer token authentication
#[derive(Clone, Debug)]
pub struct JwtAuth<S> {
    inner: S,
    jwt: Arc<JwtService>,
}

impl<S> Service<Request> for JwtAuth<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let jwt = Arc::clone(&self.jwt);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ctx = match authenticate(&jwt, &mut req) {
                Ok(ctx) => ctx,
                Err(e) => return Ok(e.into_response()),
            };
            if let Some(RequestSpan(span)) = req.extensions().get::<RequestSpan>() {
                span.record("tenant_id", ctx.tenant_id().value());
            }

            let guard = ctx.cancellation().clone().drop_guard();
            let response = inner.call(req).await;
            guard.disarm();
            response
        })
    }
}

/// Verify the token and attach the request context and claims
fn authenticate(jwt: &JwtService, req: &mut Request) -> Result<RequestContext, ApiError> {
    let token = bearer_token(req)?;
    let claims = jwt.verify(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized(e.to_string())
    })?;
    let tenant_id = claims.tenant_id(jwt.tenant_claim()).map_err(|e| {
        warn!(subject = %claims.sub, error = %e, "Token without usable tenant claim");
        ApiError::Unauthorized(e.to_string())
    })?;

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map_or_else(Uuid::now_v7, RequestId::as_uuid);
    let tenant = TenantContext::for_principal(tenant_id, claims.identity());
    let ctx = RequestContext::with_request_id(tenant, request_id);

    req.extensions_mut().insert(ctx.clone());
    req.extensions_mut().insert(claims);
    Ok(ctx)
}

fn bearer_token(req: &Request) -> Result<&str, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed Authorization header".into()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid authorization format, expected Bearer token".into())
        })
}

/// Extractor that admits only callers holding [`ADMINISTRATOR_ROLE`]
///
/// Place it first in a handler's argument list so the role is checked
/// before the body is read.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdministrator;

impl<S> FromRequestParts<S> for RequireAdministrator
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

        if claims.has_role(ADMINISTRATOR_ROLE) {
            Ok(Self)
        } else {
            warn!(subject = %claims.sub, "Write attempted without administrator role");
            Err(ApiError::Forbidden(format!("{ADMINISTRATOR_ROLE} role required")))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, body::Body, http::StatusCode, routing::get};
    use domain::TenantId;
    use infrastructure::AuthConfig;
    use tower::ServiceExt;

    use super::*;

    async fn whoami(Extension(ctx): Extension<RequestContext>) -> String {
        format!("{}:{}", ctx.tenant_id(), ctx.identity())
    }

    async fn admin_only(_: RequireAdministrator) -> &'static str {
        "ok"
    }

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(&AuthConfig::default()))
    }

    fn router(jwt: Arc<JwtService>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/admin", get(admin_only))
            .layer(JwtAuthLayer::new(jwt))
    }

    async fn call(app: Router, uri: &str, auth: Option<String>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn valid_token_builds_context() {
        let jwt = jwt();
        let token = jwt
            .issue("Jean-Michel BOB", vec!["Contributor".into()], TenantId::new(2))
            .unwrap()
            .token;

        let response = call(router(jwt), "/whoami", Some(format!("Bearer {token}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 256).await.unwrap();
        assert_eq!(body, "2:Jean-Michel BOB");
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        let jwt = jwt();
        assert_eq!(
            call(router(Arc::clone(&jwt)), "/whoami", None).await.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            call(router(Arc::clone(&jwt)), "/whoami", Some("Basic dXNlcjpwYXNz".into()))
                .await
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            call(router(jwt), "/whoami", Some("Bearer not.a.jwt".into())).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn token_without_tenant_claim_is_unauthorized() {
        // Same secret and issuer, but the tenant sits under an unknown claim name
        let other = Arc::new(JwtService::new(&AuthConfig {
            tenant_claim: "Organisation".into(),
            ..AuthConfig::default()
        }));
        let token = other.issue("x", vec![], TenantId::new(1)).unwrap().token;

        let response = call(router(jwt()), "/whoami", Some(format!("Bearer {token}"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn administrator_role_gate() {
        let jwt = jwt();
        let admin = jwt
            .issue("a", vec![ADMINISTRATOR_ROLE.into()], TenantId::new(1))
            .unwrap()
            .token;
        let contributor = jwt
            .issue("c", vec!["Contributor".into()], TenantId::new(1))
            .unwrap()
            .token;

        let ok = call(router(Arc::clone(&jwt)), "/admin", Some(format!("Bearer {admin}"))).await;
        assert_eq!(ok.status(), StatusCode::OK);

        let denied = call(router(jwt), "/admin", Some(format!("Bearer {contributor}"))).await;
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }

    /// Collects every `tenant_id` recorded on the `http_request` span
    #[derive(Clone, Default)]
    struct TenantRecords(Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TenantRecords {
        fn on_record(
            &self,
            _span: &tracing::span::Id,
            values: &tracing::span::Record<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            values.record(&mut |field: &tracing::field::Field, value: &dyn std::fmt::Debug| {
                if field.name() == "tenant_id" {
                    self.0.lock().unwrap().push(format!("{value:?}"));
                }
            });
        }
    }

    #[tokio::test]
    async fn tenant_is_recorded_on_request_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let records = TenantRecords::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(records.clone()));

        let jwt = jwt();
        let token = jwt.issue("t", vec![], TenantId::new(3)).unwrap().token;
        let app = router(jwt).layer(crate::middleware::RequestIdLayer);

        let response = call(app, "/whoami", Some(format!("Bearer {token}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*records.0.lock().unwrap(), ["3"]);
    }
}
