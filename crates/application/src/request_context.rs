//! Request context for propagating tenant, identity and request metadata
//!
//! A `RequestContext` is built by the HTTP middleware once the bearer token
//! has been verified, and passed explicitly to every service and repository
//! call. The repository reads the tenant from it to scope every statement;
//! nothing about the tenant is stored anywhere else.
//!
//! # Examples
//!
//! ```
//! use application::RequestContext;
//! use domain::{TenantContext, TenantId};
//!
//! let ctx = RequestContext::new(TenantContext::new(TenantId::new(1), "Jean-Michel ADMIN"));
//!
//! assert_eq!(ctx.tenant_id(), TenantId::new(1));
//! assert_eq!(ctx.identity(), "Jean-Michel ADMIN");
//! assert!(!ctx.request_id().is_nil());
//! ```

use chrono::{DateTime, Utc};
use domain::{TenantContext, TenantId};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context for a single request, carrying tenant, identity and metadata
///
/// - `tenant`: the caller's tenant and acting identity
/// - `request_id`: a unique identifier for tracing/logging
/// - `timestamp`: when the request was received
/// - `cancellation`: signalled when the caller gives up
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant: TenantContext,
    request_id: Uuid,
    timestamp: DateTime<Utc>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a new request context for the given tenant
    ///
    /// Generates a new request ID and captures the current timestamp.
    #[must_use]
    pub fn new(tenant: TenantContext) -> Self {
        Self::with_request_id(tenant, Uuid::now_v7())
    }

    /// Create a request context with a specific request ID
    ///
    /// Used when the request ID arrives in an `X-Request-Id` header.
    ///
    /// # Examples
    ///
    /// ```
    /// use application::RequestContext;
    /// use domain::{TenantContext, TenantId};
    /// use uuid::Uuid;
    ///
    /// let request_id = Uuid::new_v4();
    /// let ctx = RequestContext::with_request_id(TenantContext::system(TenantId::new(2)), request_id);
    /// assert_eq!(ctx.request_id(), request_id);
    /// ```
    #[must_use]
    pub fn with_request_id(tenant: TenantContext, request_id: Uuid) -> Self {
        Self {
            tenant,
            request_id,
            timestamp: Utc::now(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Create a request context with all fields specified
    ///
    /// Primarily used for testing.
    #[must_use]
    pub fn restore(tenant: TenantContext, request_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        Self {
            tenant,
            request_id,
            timestamp,
            cancellation: CancellationToken::new(),
        }
    }

    /// Context for work not triggered by a request, acting as `System`
    #[must_use]
    pub fn system(tenant_id: TenantId) -> Self {
        Self::new(TenantContext::system(tenant_id))
    }

    /// Replace the cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Get the tenant context
    #[must_use]
    pub const fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    /// Get the caller's tenant ID
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant.tenant_id()
    }

    /// Get the acting identity recorded by audit stamping
    #[must_use]
    pub fn identity(&self) -> &str {
        self.tenant.identity()
    }

    /// Get the unique request identifier
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Get the timestamp when the request was received
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the cancellation token
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the caller has asked to stop
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
