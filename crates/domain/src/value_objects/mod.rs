//! Value objects - Immutable objects defined by their attributes

pub mod tenant;
mod tenant_id;

pub use tenant::{TenantAware, TenantContext, TenantFilter};
pub use tenant_id::TenantId;
