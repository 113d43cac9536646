//! Tenant context abstraction for row-level data isolation
//!
//! - [`TenantContext`] - the resolved tenant and acting identity of one request
//! - [`TenantAware`] - implemented by rows that belong to exactly one tenant
//! - [`TenantFilter`] - implemented by query values that can be narrowed to a tenant
//!
//! A context is built once per request from the authentication claims and
//! handed explicitly to every data-access call. Nothing in this module is
//! global or mutable, so two concurrent requests can never observe each
//! other's tenant.
//!
//! # Examples
//!
//! ```
//! use domain::tenant::{TenantAware, TenantContext};
//! use domain::TenantId;
//!
//! let context = TenantContext::for_principal(TenantId::new(1), Some("Jean-Michel ADMIN"));
//! assert_eq!(context.identity(), "Jean-Michel ADMIN");
//!
//! let anonymous = TenantContext::for_principal(TenantId::new(1), None);
//! assert_eq!(anonymous.identity(), "Anonymous");
//! ```

use super::TenantId;

/// Identity recorded when a request carries no display name
pub const ANONYMOUS_IDENTITY: &str = "Anonymous";

/// Identity recorded for work not triggered by a request (seeding, jobs)
pub const SYSTEM_IDENTITY: &str = "System";

/// Tenant and acting identity for the duration of one request
///
/// The identity is what audit stamping writes into the creation and
/// last-write user columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
    identity: String,
}

impl TenantContext {
    /// Create a context for the given tenant and identity
    pub fn new(tenant_id: TenantId, identity: impl Into<String>) -> Self {
        Self {
            tenant_id,
            identity: identity.into(),
        }
    }

    /// Create a context for an authenticated principal
    ///
    /// Falls back to [`ANONYMOUS_IDENTITY`] when the principal has no
    /// (or an empty) display name.
    pub fn for_principal(tenant_id: TenantId, name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if !name.is_empty() => Self::new(tenant_id, name),
            _ => Self::new(tenant_id, ANONYMOUS_IDENTITY),
        }
    }

    /// Create a context for background work acting as [`SYSTEM_IDENTITY`]
    ///
    /// # Examples
    ///
    /// ```
    /// use domain::tenant::TenantContext;
    /// use domain::TenantId;
    ///
    /// let context = TenantContext::system(TenantId::new(2));
    /// assert_eq!(context.identity(), "System");
    /// ```
    pub fn system(tenant_id: TenantId) -> Self {
        Self::new(tenant_id, SYSTEM_IDENTITY)
    }

    /// Get the tenant ID from this context
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Get the acting identity
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Trait for entities that belong to a specific tenant
///
/// # Examples
///
/// ```
/// use domain::tenant::TenantAware;
/// use domain::TenantId;
///
/// struct Document {
///     tenant_id: TenantId,
/// }
///
/// impl TenantAware for Document {
///     fn tenant_id(&self) -> TenantId {
///         self.tenant_id
///     }
/// }
///
/// let doc = Document { tenant_id: TenantId::new(1) };
/// assert!(doc.belongs_to(TenantId::new(1)));
/// ```
pub trait TenantAware {
    /// Get the tenant ID this entity belongs to
    fn tenant_id(&self) -> TenantId;

    /// Check if this entity belongs to the given tenant
    fn belongs_to(&self, tenant_id: TenantId) -> bool {
        self.tenant_id() == tenant_id
    }

    /// Check if this entity belongs to the given context's tenant
    fn belongs_to_context(&self, context: &TenantContext) -> bool {
        self.belongs_to(context.tenant_id())
    }
}

/// Narrowing of a query value to a single tenant
///
/// Repositories call this on every specification they receive before
/// touching storage; the result carries the tenant equality predicate in
/// addition to whatever the caller asked for.
pub trait TenantFilter {
    /// The output type after applying the tenant filter
    type Output;

    /// Return a copy restricted to the context's tenant
    fn with_tenant(&self, context: &TenantContext) -> Self::Output;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestEntity {
        tenant_id: TenantId,
    }

    impl TenantAware for TestEntity {
        fn tenant_id(&self) -> TenantId {
            self.tenant_id
        }
    }

    #[test]
    fn test_tenant_context_creation() {
        let context = TenantContext::new(TenantId::new(1), "alice");
        assert_eq!(context.tenant_id(), TenantId::new(1));
        assert_eq!(context.identity(), "alice");
    }

    #[test]
    fn test_for_principal_uses_name() {
        let context = TenantContext::for_principal(TenantId::new(2), Some("bob"));
        assert_eq!(context.identity(), "bob");
    }

    #[test]
    fn test_for_principal_without_name_is_anonymous() {
        let context = TenantContext::for_principal(TenantId::new(2), None);
        assert_eq!(context.identity(), ANONYMOUS_IDENTITY);
    }

    #[test]
    fn test_for_principal_blank_name_is_anonymous() {
        let context = TenantContext::for_principal(TenantId::new(2), Some("   "));
        assert_eq!(context.identity(), ANONYMOUS_IDENTITY);
    }

    #[test]
    fn test_system_context() {
        let context = TenantContext::system(TenantId::new(3));
        assert_eq!(context.identity(), SYSTEM_IDENTITY);
        assert_eq!(context.tenant_id().value(), 3);
    }

    #[test]
    fn test_tenant_aware_trait() {
        let entity = TestEntity {
            tenant_id: TenantId::new(1),
        };

        assert_eq!(entity.tenant_id(), TenantId::new(1));
        assert!(entity.belongs_to(TenantId::new(1)));
        assert!(!entity.belongs_to(TenantId::new(2)));
    }

    #[test]
    fn test_belongs_to_context() {
        let entity = TestEntity {
            tenant_id: TenantId::new(1),
        };
        let context = TenantContext::system(TenantId::new(1));
        let other_context = TenantContext::system(TenantId::new(2));

        assert!(entity.belongs_to_context(&context));
        assert!(!entity.belongs_to_context(&other_context));
    }

    #[test]
    fn test_context_equality() {
        let context1 = TenantContext::new(TenantId::new(1), "a");
        let context2 = TenantContext::new(TenantId::new(1), "a");
        let context3 = TenantContext::new(TenantId::new(1), "b");

        assert_eq!(context1, context2);
        assert_ne!(context1, context3);
    }

    #[test]
    fn test_context_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TenantContext>();
    }
}
