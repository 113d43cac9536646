//! Application services - Use case implementations

mod sensitive_data_service;
mod tenant_service;

pub use sensitive_data_service::{SearchQuery, SensitiveDataService};
pub use tenant_service::TenantService;
