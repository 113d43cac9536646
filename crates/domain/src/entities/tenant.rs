//! Tenant reference data

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::{Entity, NoRelation};
use crate::{
    TenantId,
    query::{FieldDescriptor, FieldKind, FieldRegistry, FilterOperator, FilterPredicate},
};

static TENANT_FIELDS: LazyLock<FieldRegistry> = LazyLock::new(|| {
    FieldRegistry::builder(Tenant::NAME, "tenants")
        .field(
            FieldDescriptor::new("Id", "id", FieldKind::Integer)
                .sortable()
                .paging_order(0),
        )
        .field(
            FieldDescriptor::new("Name", "name", FieldKind::Text)
                .filter("name", FilterPredicate::Contains, FilterOperator::And)
                .sortable()
                .searchable(),
        )
        .build()
});

/// A customer whose rows are isolated from every other tenant's
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
}

impl Tenant {
    pub fn new(id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Entity for Tenant {
    type Key = TenantId;
    type Relation = NoRelation;

    const NAME: &'static str = "Tenant";
    const KEY_FIELD: &'static str = "Id";

    fn fields() -> &'static FieldRegistry {
        &TENANT_FIELDS
    }

    fn identifier(&self) -> TenantId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_is_not_scoped_or_audited() {
        let registry = Tenant::fields();
        assert!(registry.tenant_field().is_none());
        assert!(!registry.is_audited());
        assert_eq!(registry.table(), "tenants");
    }

    #[test]
    fn identifier_is_id() {
        let tenant = Tenant::new(TenantId::new(3), "Locataire 3");
        assert_eq!(tenant.identifier(), TenantId::new(3));
        assert!(tenant.owner().is_none());
        assert!(tenant.audit().is_none());
    }
}
