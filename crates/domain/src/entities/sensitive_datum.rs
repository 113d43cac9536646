//! Sensitive datum entity - A tenant-owned piece of personal data

use std::{fmt, str::FromStr, sync::LazyLock};

use serde::{Deserialize, Serialize};

use super::{AuditFields, Entity, RelationKey, Tenant};
use crate::{
    DomainError, TenantId,
    query::{
        FieldDescriptor, FieldKind, FieldRegistry, FilterOperator, FilterPredicate, Literal,
        RelationDescriptor,
    },
    tenant::TenantAware,
};

/// Category of a sensitive datum
///
/// Stored as its ordinal; serialized and parsed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensitiveDatumType {
    Name,
    Email,
    SocialSecurityNumber,
    BankAccount,
}

impl SensitiveDatumType {
    /// Variant names, indexed by ordinal
    pub const NAMES: &'static [&'static str] =
        &["Name", "Email", "SocialSecurityNumber", "BankAccount"];

    pub const ALL: [Self; 4] = [
        Self::Name,
        Self::Email,
        Self::SocialSecurityNumber,
        Self::BankAccount,
    ];

    /// Storage ordinal
    pub const fn ordinal(self) -> i64 {
        match self {
            Self::Name => 0,
            Self::Email => 1,
            Self::SocialSecurityNumber => 2,
            Self::BankAccount => 3,
        }
    }

    /// Variant for a storage ordinal
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::SocialSecurityNumber => "SocialSecurityNumber",
            Self::BankAccount => "BankAccount",
        }
    }
}

impl fmt::Display for SensitiveDatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensitiveDatumType {
    type Err = DomainError;

    /// Parse a variant name, ignoring ASCII case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                DomainError::invalid_value("Type", format!("'{s}' is not a sensitive datum type"))
            })
    }
}

impl From<SensitiveDatumType> for Literal {
    fn from(t: SensitiveDatumType) -> Self {
        Self::Integer(t.ordinal())
    }
}

/// Relations of [`SensitiveDatum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveDatumRelation {
    Tenant,
}

impl RelationKey for SensitiveDatumRelation {
    fn name(self) -> &'static str {
        match self {
            Self::Tenant => "Tenant",
        }
    }
}

static SENSITIVE_DATUM_FIELDS: LazyLock<FieldRegistry> = LazyLock::new(|| {
    FieldRegistry::builder(SensitiveDatum::NAME, "sensitive_data")
        .field(
            FieldDescriptor::new("Identifier", "id", FieldKind::Integer)
                .sortable()
                .paging_order(0),
        )
        .field(
            FieldDescriptor::new("Type", "type", FieldKind::Enum(SensitiveDatumType::NAMES))
                .filter("type", FilterPredicate::In, FilterOperator::And)
                .sort_group("default", 1),
        )
        .field(
            FieldDescriptor::new("Name", "name", FieldKind::Text)
                .filter("name", FilterPredicate::Contains, FilterOperator::And)
                .sort_group("default", 0)
                .searchable(),
        )
        .field(FieldDescriptor::new("Content", "content", FieldKind::Text).nullable().searchable())
        .field(FieldDescriptor::new("TenantId", "tenant_id", FieldKind::Integer).sortable())
        .relation(RelationDescriptor {
            name: "Tenant",
            local_column: "tenant_id",
            remote_column: "id",
            target: Tenant::fields,
        })
        .tenant_scope("TenantId")
        .audited()
        .build()
});

/// A named piece of personal data owned by exactly one tenant
///
/// `(name, tenant_id)` is unique in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveDatum {
    #[serde(default)]
    pub identifier: i32,
    #[serde(rename = "type")]
    pub datum_type: SensitiveDatumType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub tenant_id: TenantId,
    /// Loaded only when the `Tenant` relation is included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl SensitiveDatum {
    /// Create an unsaved datum; storage assigns the identifier
    pub fn new(
        datum_type: SensitiveDatumType,
        name: impl Into<String>,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            identifier: 0,
            datum_type,
            name: name.into(),
            content: None,
            tenant_id,
            tenant: None,
            audit: AuditFields::default(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub const fn with_identifier(mut self, identifier: i32) -> Self {
        self.identifier = identifier;
        self
    }
}

impl TenantAware for SensitiveDatum {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl Entity for SensitiveDatum {
    type Key = i32;
    type Relation = SensitiveDatumRelation;

    const NAME: &'static str = "SensitiveDatum";
    const KEY_FIELD: &'static str = "Identifier";

    fn fields() -> &'static FieldRegistry {
        &SENSITIVE_DATUM_FIELDS
    }

    fn identifier(&self) -> i32 {
        self.identifier
    }

    fn audit(&self) -> Option<&AuditFields> {
        Some(&self.audit)
    }

    fn audit_mut(&mut self) -> Option<&mut AuditFields> {
        Some(&mut self.audit)
    }

    fn owner(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn type_ordinals_round_trip() {
        for t in SensitiveDatumType::ALL {
            assert_eq!(SensitiveDatumType::from_ordinal(t.ordinal()), Some(t));
            assert_eq!(
                SensitiveDatumType::NAMES[usize::try_from(t.ordinal()).unwrap()],
                t.as_str()
            );
        }
        assert_eq!(SensitiveDatumType::from_ordinal(4), None);
        assert_eq!(SensitiveDatumType::from_ordinal(-1), None);
    }

    #[test]
    fn type_parses_ignoring_case() {
        assert_eq!(
            "socialsecuritynumber".parse::<SensitiveDatumType>().unwrap(),
            SensitiveDatumType::SocialSecurityNumber
        );
        assert!("Phone".parse::<SensitiveDatumType>().is_err());
    }

    #[test]
    fn type_literal_is_ordinal() {
        assert_eq!(Literal::from(SensitiveDatumType::BankAccount), Literal::Integer(3));
    }

    #[test]
    fn registry_shape() {
        let registry = SensitiveDatum::fields();
        assert_eq!(registry.table(), "sensitive_data");
        assert_eq!(registry.tenant_field().map(FieldDescriptor::column), Some("tenant_id"));
        assert!(registry.is_audited());
        assert_eq!(registry.relation("Tenant").map(|r| r.target().table()), Some("tenants"));
    }

    #[test]
    fn owner_and_audit_are_exposed() {
        let mut datum = SensitiveDatum::new(SensitiveDatumType::Email, "Email", TenantId::new(1));
        assert_eq!(datum.owner(), Some(TenantId::new(1)));
        assert!(datum.belongs_to(TenantId::new(1)));
        assert!(datum.audit_mut().is_some());
        assert_eq!(datum.identifier(), 0);
    }

    #[test]
    fn serializes_type_by_name_and_flattens_audit() {
        let datum = SensitiveDatum::new(SensitiveDatumType::Email, "Email du locataire 1", TenantId::new(1))
            .with_content("contact@locataire1.fr")
            .with_identifier(2);
        let value = serde_json::to_value(&datum).unwrap();
        assert_eq!(value["type"], json!("Email"));
        assert_eq!(value["tenant_id"], json!(1));
        assert_eq!(value["track_creation_user"], json!(""));
        assert!(value.get("tenant").is_none());

        let back: SensitiveDatum = serde_json::from_value(value).unwrap();
        assert_eq!(back, datum);
    }
}
