//! Domain layer for the row-level security demo
//!
//! Contains the tenant value objects, the entities stored per tenant and the
//! storage-independent query model (field registry, predicates, query
//! specification). This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod query;
pub mod value_objects;

// Re-export tenant module for convenient access
pub use value_objects::tenant;

pub use entities::{
    AuditFields, Entity, NoRelation, RelationKey, SensitiveDatum, SensitiveDatumRelation,
    SensitiveDatumType, Tenant,
};
pub use errors::DomainError;
pub use value_objects::*;
