//! Per-entity field-capability registry
//!
//! Each entity declares, once, which of its fields exist in storage, what type
//! they have, which filter predicates they accept and whether they take part
//! in sorting, alias filtering, global search or deterministic paging. The
//! predicate builder and the SQL compiler consult the registry instead of
//! inspecting types at run time, so an unknown field name is rejected while
//! the specification is being built.
//!
//! Registries live in `LazyLock` statics and are handed out as
//! `&'static FieldRegistry`, which lets resolved [`FieldPath`]s borrow their
//! descriptors for free.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{FilterOperator, FilterPredicate, Literal};
use crate::DomainError;

const ALL_PREDICATES: &[FilterPredicate] = &FilterPredicate::ALL;

const UNORDERED_PREDICATES: &[FilterPredicate] = &[
    FilterPredicate::Equal,
    FilterPredicate::DoesNotEqual,
    FilterPredicate::Contains,
    FilterPredicate::StartsWith,
    FilterPredicate::EndsWith,
    FilterPredicate::In,
];

/// Names of the audit fields added by [`FieldRegistryBuilder::audited`]
pub mod audit_fields {
    pub const CREATION_USER: &str = "TrackCreationUser";
    pub const CREATION_TIME: &str = "TrackCreationTime";
    pub const LAST_WRITE_USER: &str = "TrackLastWriteUser";
    pub const LAST_WRITE_TIME: &str = "TrackLastWriteTime";

    /// Storage columns that hold creation provenance
    pub const CREATION_COLUMNS: [&str; 2] = ["track_creation_user", "track_creation_time"];
}

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
    Uuid,
    /// Stored as the ordinal of the variant name in the slice
    Enum(&'static [&'static str]),
}

impl FieldKind {
    /// Whether the column already holds text
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Predicates accepted when a field does not narrow them explicitly
    #[must_use]
    pub const fn default_predicates(self) -> &'static [FilterPredicate] {
        match self {
            Self::Integer | Self::Real | Self::Text | Self::Timestamp => ALL_PREDICATES,
            Self::Boolean | Self::Uuid | Self::Enum(_) => UNORDERED_PREDICATES,
        }
    }

    /// Convert caller input into a literal of this kind
    ///
    /// JSON `null` always becomes [`Literal::Null`]. Enum variants match by
    /// name, ignoring case, or by ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidValue`] when the input cannot represent
    /// a value of this kind.
    pub fn coerce(self, field: &str, value: &Value) -> Result<Literal, DomainError> {
        if value.is_null() {
            return Ok(Literal::Null);
        }
        let invalid = |expected: &str| {
            DomainError::invalid_value(field, format!("{value} is not {expected}"))
        };

        match self {
            Self::Integer => match value {
                Value::Number(n) => n.as_i64().map(Literal::Integer).ok_or_else(|| invalid("an integer")),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Literal::Integer)
                    .map_err(|_| invalid("an integer")),
                _ => Err(invalid("an integer")),
            },
            Self::Real => match value {
                Value::Number(n) => n.as_f64().map(Literal::Real).ok_or_else(|| invalid("a number")),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Literal::Real)
                    .map_err(|_| invalid("a number")),
                _ => Err(invalid("a number")),
            },
            Self::Text => match value {
                Value::String(s) => Ok(Literal::Text(s.clone())),
                Value::Number(_) | Value::Bool(_) => Ok(Literal::Text(value.to_string())),
                _ => Err(invalid("text")),
            },
            Self::Boolean => match value {
                Value::Bool(b) => Ok(Literal::Boolean(*b)),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Literal::Boolean(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Literal::Boolean(false)),
                _ => Err(invalid("a boolean")),
            },
            Self::Timestamp => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|dt| Literal::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|_| invalid("an RFC 3339 timestamp")),
                _ => Err(invalid("an RFC 3339 timestamp")),
            },
            Self::Uuid => match value {
                Value::String(s) => Uuid::parse_str(s.trim())
                    .map(Literal::Uuid)
                    .map_err(|_| invalid("a UUID")),
                _ => Err(invalid("a UUID")),
            },
            Self::Enum(variants) => {
                let ordinal = match value {
                    Value::String(s) => variants
                        .iter()
                        .position(|v| v.eq_ignore_ascii_case(s.trim())),
                    Value::Number(n) => n
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .filter(|n| *n < variants.len()),
                    _ => None,
                };
                ordinal
                    .and_then(|i| i64::try_from(i).ok())
                    .map(Literal::Integer)
                    .ok_or_else(|| invalid(&format!("one of {}", variants.join(", "))))
            },
        }
    }
}

/// Alias-based filtering declared on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterCapability {
    pub alias: &'static str,
    pub predicate: FilterPredicate,
    pub operator: FilterOperator,
}

/// Sort participation declared on a field
///
/// Fields sharing a `group` are sorted together, in `order`, when a caller
/// asks to sort by the group name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortCapability {
    pub alias: &'static str,
    pub group: Option<&'static str>,
    pub order: i32,
}

/// Capabilities of a single stored field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: &'static str,
    column: &'static str,
    kind: FieldKind,
    nullable: bool,
    predicates: &'static [FilterPredicate],
    filter: Option<FilterCapability>,
    sort: Option<SortCapability>,
    global_search: Option<FilterPredicate>,
    paging_order: Option<i32>,
}

impl FieldDescriptor {
    /// Declare a non-nullable field with the kind's default predicates
    #[must_use]
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column,
            kind,
            nullable: false,
            predicates: kind.default_predicates(),
            filter: None,
            sort: None,
            global_search: None,
            paging_order: None,
        }
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Restrict the predicates this field accepts
    #[must_use]
    pub const fn predicates(mut self, predicates: &'static [FilterPredicate]) -> Self {
        self.predicates = predicates;
        self
    }

    /// Expose the field under a filter alias
    #[must_use]
    pub const fn filter(
        mut self,
        alias: &'static str,
        predicate: FilterPredicate,
        operator: FilterOperator,
    ) -> Self {
        self.filter = Some(FilterCapability {
            alias,
            predicate,
            operator,
        });
        self
    }

    /// Allow sorting by the field's own name
    #[must_use]
    pub const fn sortable(mut self) -> Self {
        self.sort = Some(SortCapability {
            alias: self.name,
            group: None,
            order: 0,
        });
        self
    }

    /// Allow sorting, as part of a named group at the given position
    #[must_use]
    pub const fn sort_group(mut self, group: &'static str, order: i32) -> Self {
        self.sort = Some(SortCapability {
            alias: self.name,
            group: Some(group),
            order,
        });
        self
    }

    /// Include the field in free-text global search using `Contains`
    #[must_use]
    pub const fn searchable(self) -> Self {
        self.searchable_with(FilterPredicate::Contains)
    }

    #[must_use]
    pub const fn searchable_with(mut self, predicate: FilterPredicate) -> Self {
        self.global_search = Some(predicate);
        self
    }

    /// Append this field, ascending, to the sort list of paged queries
    #[must_use]
    pub const fn paging_order(mut self, order: i32) -> Self {
        self.paging_order = Some(order);
        self
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn column(&self) -> &'static str {
        self.column
    }

    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub const fn filter_capability(&self) -> Option<FilterCapability> {
        self.filter
    }

    pub const fn sort_capability(&self) -> Option<SortCapability> {
        self.sort
    }

    pub const fn global_search(&self) -> Option<FilterPredicate> {
        self.global_search
    }

    pub const fn paging_position(&self) -> Option<i32> {
        self.paging_order
    }

    pub const fn is_sortable(&self) -> bool {
        self.sort.is_some()
    }

    /// Whether the field accepts the given predicate
    pub fn supports(&self, predicate: FilterPredicate) -> bool {
        self.predicates.contains(&predicate)
    }
}

/// Named link from one entity's table to another's
#[derive(Debug, Clone, Copy)]
pub struct RelationDescriptor {
    pub name: &'static str,
    pub local_column: &'static str,
    pub remote_column: &'static str,
    pub target: fn() -> &'static FieldRegistry,
}

impl RelationDescriptor {
    /// Registry of the related entity
    pub fn target(&self) -> &'static FieldRegistry {
        (self.target)()
    }
}

/// Field capabilities of one entity
#[derive(Debug)]
pub struct FieldRegistry {
    entity: &'static str,
    table: &'static str,
    fields: Vec<FieldDescriptor>,
    relations: Vec<RelationDescriptor>,
    tenant_scope: Option<&'static str>,
    audited: bool,
}

impl FieldRegistry {
    /// Start declaring the registry for `entity`, stored in `table`
    pub fn builder(entity: &'static str, table: &'static str) -> FieldRegistryBuilder {
        FieldRegistryBuilder {
            registry: Self {
                entity,
                table,
                fields: Vec::new(),
                relations: Vec::new(),
                tenant_scope: None,
                audited: false,
            },
        }
    }

    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    pub const fn table(&self) -> &'static str {
        self.table
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    /// Whether the entity carries audit fields
    pub const fn is_audited(&self) -> bool {
        self.audited
    }

    /// Look up a field by name, exact match first, then ignoring ASCII case
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    /// Look up a relation by name, ignoring ASCII case
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Field holding the owning tenant, for tenant-scoped entities
    pub fn tenant_field(&self) -> Option<&FieldDescriptor> {
        self.tenant_scope.and_then(|name| self.field(name))
    }

    /// Fields that take part in free-text global search
    pub fn global_search_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.global_search.is_some())
    }

    /// Field exposed under the given filter alias, ignoring ASCII case
    pub fn filter_alias(&self, alias: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| {
            f.filter
                .is_some_and(|cap| cap.alias.eq_ignore_ascii_case(alias))
        })
    }

    /// Sortable fields whose alias or group is `column`, in declared order
    pub fn sort_matches(&self, column: &str) -> Vec<&FieldDescriptor> {
        let mut matches: Vec<&FieldDescriptor> = self
            .fields
            .iter()
            .filter(|f| {
                f.sort.is_some_and(|cap| {
                    cap.alias.eq_ignore_ascii_case(column)
                        || cap.group.is_some_and(|g| g.eq_ignore_ascii_case(column))
                })
            })
            .collect();
        matches.sort_by_key(|f| f.sort.map_or(0, |cap| cap.order));
        matches
    }

    /// Fields appended to paged queries, in paging order
    pub fn paging_fields(&self) -> Vec<&FieldDescriptor> {
        let mut fields: Vec<&FieldDescriptor> = self
            .fields
            .iter()
            .filter(|f| f.paging_order.is_some())
            .collect();
        fields.sort_by_key(|f| f.paging_order);
        fields
    }

    /// Resolve a possibly dotted field path such as `"Tenant.Name"`
    ///
    /// Every segment but the last must name a relation; the last must name a
    /// field of the entity reached through those relations.
    ///
    /// # Errors
    ///
    /// [`DomainError::UnknownRelation`] or [`DomainError::UnknownField`] when a
    /// segment does not exist.
    pub fn resolve(&'static self, path: &str) -> Result<FieldPath, DomainError> {
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        let Some((last, hops)) = segments.split_last() else {
            return Err(DomainError::unknown_field(self.entity, path));
        };

        let mut current: &'static Self = self;
        let mut relations = Vec::with_capacity(hops.len());
        for hop in hops {
            let relation = current
                .relation(hop)
                .ok_or_else(|| DomainError::UnknownRelation {
                    entity: current.entity.to_string(),
                    relation: (*hop).to_string(),
                })?;
            relations.push(relation);
            current = relation.target();
        }

        let field = current
            .field(last)
            .ok_or_else(|| DomainError::unknown_field(current.entity, path))?;

        let mut canonical: Vec<&str> = relations.iter().map(|r| r.name).collect();
        canonical.push(field.name);

        Ok(FieldPath {
            relations,
            field,
            path: canonical.join("."),
        })
    }
}

/// Builder for [`FieldRegistry`]
#[derive(Debug)]
pub struct FieldRegistryBuilder {
    registry: FieldRegistry,
}

impl FieldRegistryBuilder {
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.registry.fields.push(field);
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: RelationDescriptor) -> Self {
        self.registry.relations.push(relation);
        self
    }

    /// Mark `field` as the owning-tenant column
    #[must_use]
    pub fn tenant_scope(mut self, field: &'static str) -> Self {
        self.registry.tenant_scope = Some(field);
        self
    }

    /// Add the four sortable audit fields
    #[must_use]
    pub fn audited(mut self) -> Self {
        self.registry.audited = true;
        self.field(
            FieldDescriptor::new(
                audit_fields::CREATION_USER,
                "track_creation_user",
                FieldKind::Text,
            )
            .sortable(),
        )
        .field(
            FieldDescriptor::new(
                audit_fields::CREATION_TIME,
                "track_creation_time",
                FieldKind::Timestamp,
            )
            .sortable(),
        )
        .field(
            FieldDescriptor::new(
                audit_fields::LAST_WRITE_USER,
                "track_last_write_user",
                FieldKind::Text,
            )
            .sortable(),
        )
        .field(
            FieldDescriptor::new(
                audit_fields::LAST_WRITE_TIME,
                "track_last_write_time",
                FieldKind::Timestamp,
            )
            .sortable(),
        )
    }

    pub fn build(self) -> FieldRegistry {
        self.registry
    }
}

/// A field reached from an entity, possibly through relations
#[derive(Clone)]
pub struct FieldPath {
    relations: Vec<&'static RelationDescriptor>,
    field: &'static FieldDescriptor,
    path: String,
}

impl FieldPath {
    /// Relations traversed before reaching the field, outermost first
    pub fn relations(&self) -> &[&'static RelationDescriptor] {
        &self.relations
    }

    pub const fn field(&self) -> &'static FieldDescriptor {
        self.field
    }

    /// Canonical dotted path
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_nested(&self) -> bool {
        !self.relations.is_empty()
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldPath").field(&self.path).finish()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use serde_json::json;

    use super::*;

    static OWNER: LazyLock<FieldRegistry> = LazyLock::new(|| {
        FieldRegistry::builder("Owner", "owners")
            .field(FieldDescriptor::new("Id", "id", FieldKind::Integer).sortable())
            .field(FieldDescriptor::new("Label", "label", FieldKind::Text))
            .build()
    });

    static ITEM: LazyLock<FieldRegistry> = LazyLock::new(|| {
        FieldRegistry::builder("Item", "items")
            .field(
                FieldDescriptor::new("Id", "id", FieldKind::Integer)
                    .sortable()
                    .paging_order(0),
            )
            .field(
                FieldDescriptor::new("Title", "title", FieldKind::Text)
                    .filter("title", FilterPredicate::StartsWith, FilterOperator::And)
                    .sort_group("default", 1)
                    .searchable(),
            )
            .field(
                FieldDescriptor::new("Colour", "colour", FieldKind::Enum(&["Red", "Blue"]))
                    .sort_group("default", 0),
            )
            .field(FieldDescriptor::new("OwnerId", "owner_id", FieldKind::Integer))
            .relation(RelationDescriptor {
                name: "Owner",
                local_column: "owner_id",
                remote_column: "id",
                target: || &*OWNER,
            })
            .tenant_scope("OwnerId")
            .audited()
            .build()
    });

    #[test]
    fn looks_up_fields_ignoring_case() {
        assert_eq!(ITEM.field("title").map(FieldDescriptor::column), Some("title"));
        assert!(ITEM.field("Missing").is_none());
        assert_eq!(ITEM.tenant_field().map(FieldDescriptor::name), Some("OwnerId"));
        assert!(ITEM.is_audited());
        assert!(ITEM.field("TrackCreationTime").is_some());
    }

    #[test]
    fn resolves_direct_and_nested_paths() {
        let direct = ITEM.resolve("Title").unwrap();
        assert!(!direct.is_nested());
        assert_eq!(direct.path(), "Title");

        let nested = ITEM.resolve("owner.label").unwrap();
        assert!(nested.is_nested());
        assert_eq!(nested.path(), "Owner.Label");
        assert_eq!(nested.field().column(), "label");
        assert_eq!(nested.relations()[0].remote_column, "id");
    }

    #[test]
    fn unknown_segments_fail() {
        assert!(matches!(
            ITEM.resolve("Weight"),
            Err(DomainError::UnknownField { .. })
        ));
        assert!(matches!(
            ITEM.resolve("Maker.Label"),
            Err(DomainError::UnknownRelation { .. })
        ));
        assert!(matches!(
            ITEM.resolve("Owner.Weight"),
            Err(DomainError::UnknownField { .. })
        ));
    }

    #[test]
    fn sort_matches_by_alias_or_group_in_order() {
        let names: Vec<_> = ITEM
            .sort_matches("DEFAULT")
            .into_iter()
            .map(FieldDescriptor::name)
            .collect();
        assert_eq!(names, ["Colour", "Title"]);

        let names: Vec<_> = ITEM
            .sort_matches("id")
            .into_iter()
            .map(FieldDescriptor::name)
            .collect();
        assert_eq!(names, ["Id"]);
    }

    #[test]
    fn alias_and_search_lookups() {
        assert_eq!(ITEM.filter_alias("TITLE").map(FieldDescriptor::name), Some("Title"));
        assert!(ITEM.filter_alias("colour").is_none());
        assert_eq!(ITEM.global_search_fields().count(), 1);
        assert_eq!(ITEM.paging_fields().len(), 1);
    }

    #[test]
    fn enum_predicates_exclude_ordering() {
        let colour = ITEM.field("Colour").unwrap();
        assert!(colour.supports(FilterPredicate::In));
        assert!(colour.supports(FilterPredicate::Contains));
        assert!(!colour.supports(FilterPredicate::LessThan));
    }

    #[test]
    fn coerces_enum_by_name_or_ordinal() {
        let kind = FieldKind::Enum(&["Red", "Blue"]);
        assert_eq!(kind.coerce("Colour", &json!("blue")).unwrap(), Literal::Integer(1));
        assert_eq!(kind.coerce("Colour", &json!(0)).unwrap(), Literal::Integer(0));
        assert!(kind.coerce("Colour", &json!("Green")).is_err());
        assert!(kind.coerce("Colour", &json!(2)).is_err());
    }

    #[test]
    fn coerces_scalars() {
        assert_eq!(
            FieldKind::Integer.coerce("Id", &json!(" 12 ")).unwrap(),
            Literal::Integer(12)
        );
        assert!(FieldKind::Integer.coerce("Id", &json!("twelve")).is_err());
        assert_eq!(
            FieldKind::Text.coerce("Title", &json!(5)).unwrap(),
            Literal::Text("5".into())
        );
        assert_eq!(
            FieldKind::Boolean.coerce("Flag", &json!("TRUE")).unwrap(),
            Literal::Boolean(true)
        );
        assert_eq!(FieldKind::Uuid.coerce("Key", &json!(null)).unwrap(), Literal::Null);
        assert!(FieldKind::Uuid.coerce("Key", &json!("nope")).is_err());
        assert!(matches!(
            FieldKind::Timestamp
                .coerce("At", &json!("2024-05-01T10:00:00Z"))
                .unwrap(),
            Literal::Timestamp(_)
        ));
    }
}
