//! Domain entities - Objects with identity stored by the generic repository

mod audit;
mod sensitive_datum;
mod tenant;

use std::fmt;

pub use audit::AuditFields;
pub use sensitive_datum::{SensitiveDatum, SensitiveDatumRelation, SensitiveDatumType};
pub use tenant::Tenant;

use crate::{
    TenantId,
    query::{FieldRegistry, Literal},
};

/// Named relation an entity can eager-load
pub trait RelationKey: Copy + fmt::Debug + Send + Sync + 'static {
    /// Relation name as declared in the entity's field registry
    fn name(self) -> &'static str;
}

/// Relation type for entities without relations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoRelation {}

impl RelationKey for NoRelation {
    fn name(self) -> &'static str {
        match self {}
    }
}

/// Contract every repository-managed entity fulfils
///
/// The field registry describes storage; `owner` ties a row to a tenant for
/// entities whose registry declares a tenant scope; `audit_mut` exposes the
/// fields the repository stamps on every write.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Primary key type
    type Key: Copy + fmt::Debug + fmt::Display + Send + Sync + Into<Literal> + 'static;

    /// Relations that can be passed to `add_include`
    type Relation: RelationKey;

    /// Entity name used in errors and logs
    const NAME: &'static str;

    /// Registry field holding the primary key
    const KEY_FIELD: &'static str;

    /// Field capabilities of this entity
    fn fields() -> &'static FieldRegistry;

    fn identifier(&self) -> Self::Key;

    fn audit(&self) -> Option<&AuditFields> {
        None
    }

    fn audit_mut(&mut self) -> Option<&mut AuditFields> {
        None
    }

    /// Owning tenant, for tenant-scoped entities
    fn owner(&self) -> Option<TenantId> {
        None
    }
}
