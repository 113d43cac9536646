//! Row mappings for repository-managed entities
//!
//! [`SqlEntity`] is what [`SqliteRepository`](super::SqliteRepository) needs
//! beyond the domain [`Entity`] contract: decoding a row, the column values
//! to write, and eager loading of included relations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    AuditFields, Entity, SensitiveDatum, SensitiveDatumRelation, SensitiveDatumType, Tenant,
    TenantId,
    entities::RelationKey,
    query::{FieldDescriptor, FieldKind, Literal},
};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};

use super::sql::{SqlWriter, ident};

/// Storage mapping of an entity
#[async_trait]
pub trait SqlEntity: Entity {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;

    /// Column values to write, without the key column
    fn values(&self) -> Vec<(&'static str, Literal)>;

    /// Whether storage assigns the key on insert
    fn key_is_generated(&self) -> bool {
        false
    }

    /// Load the named relations onto freshly read rows
    async fn load_includes(
        _conn: &mut SqliteConnection,
        _items: &mut [Self],
        _includes: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

/// Descriptor of the key field
///
/// Registries always declare their key field; a missing one is a
/// programming error reported as an unknown field.
pub fn key_field<E: Entity>() -> Result<&'static FieldDescriptor, domain::DomainError> {
    E::fields()
        .field(E::KEY_FIELD)
        .ok_or_else(|| domain::DomainError::unknown_field(E::NAME, E::KEY_FIELD))
}

/// Decode one column as a literal of the field's kind
///
/// Enum ordinals come back as their variant name.
pub fn decode_literal(row: &SqliteRow, index: usize, kind: FieldKind) -> Result<Literal, sqlx::Error> {
    let literal = match kind {
        FieldKind::Integer => row.try_get::<Option<i64>, _>(index)?.into(),
        FieldKind::Real => row.try_get::<Option<f64>, _>(index)?.into(),
        FieldKind::Text => row.try_get::<Option<String>, _>(index)?.into(),
        FieldKind::Boolean => row.try_get::<Option<bool>, _>(index)?.into(),
        FieldKind::Timestamp => row.try_get::<Option<DateTime<Utc>>, _>(index)?.into(),
        FieldKind::Uuid => match row.try_get::<Option<String>, _>(index)? {
            Some(text) => uuid::Uuid::parse_str(&text)
                .map(Literal::Uuid)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            None => Literal::Null,
        },
        FieldKind::Enum(variants) => match row.try_get::<Option<i64>, _>(index)? {
            Some(ordinal) => usize::try_from(ordinal)
                .ok()
                .and_then(|i| variants.get(i))
                .map(|name| Literal::Text((*name).to_string()))
                .ok_or_else(|| decode_error(format!("enum ordinal {ordinal} out of range")))?,
            None => Literal::Null,
        },
    };
    Ok(literal)
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn audit_from_row(row: &SqliteRow) -> Result<AuditFields, sqlx::Error> {
    Ok(AuditFields {
        track_creation_user: row.try_get("track_creation_user")?,
        track_creation_time: row.try_get("track_creation_time")?,
        track_last_write_user: row.try_get("track_last_write_user")?,
        track_last_write_time: row.try_get("track_last_write_time")?,
    })
}

fn audit_values(audit: &AuditFields) -> [(&'static str, Literal); 4] {
    [
        ("track_creation_user", audit.track_creation_user.clone().into()),
        ("track_creation_time", audit.track_creation_time.into()),
        ("track_last_write_user", audit.track_last_write_user.clone().into()),
        ("track_last_write_time", audit.track_last_write_time.into()),
    ]
}

#[async_trait]
impl SqlEntity for Tenant {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: TenantId::new(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Literal)> {
        vec![("name", self.name.clone().into())]
    }
}

#[async_trait]
impl SqlEntity for SensitiveDatum {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let ordinal: i64 = row.try_get("type")?;
        let datum_type = SensitiveDatumType::from_ordinal(ordinal)
            .ok_or_else(|| decode_error(format!("unknown sensitive datum type {ordinal}")))?;

        Ok(Self {
            identifier: row.try_get("id")?,
            datum_type,
            name: row.try_get("name")?,
            content: row.try_get("content")?,
            tenant_id: TenantId::new(row.try_get("tenant_id")?),
            tenant: None,
            audit: audit_from_row(row)?,
        })
    }

    fn values(&self) -> Vec<(&'static str, Literal)> {
        let mut values = vec![
            ("type", self.datum_type.into()),
            ("name", self.name.clone().into()),
            ("content", self.content.clone().into()),
            ("tenant_id", self.tenant_id.into()),
        ];
        values.extend(audit_values(&self.audit));
        values
    }

    fn key_is_generated(&self) -> bool {
        self.identifier == 0
    }

    async fn load_includes(
        conn: &mut SqliteConnection,
        items: &mut [Self],
        includes: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let wants_tenant = includes
            .iter()
            .any(|name| *name == SensitiveDatumRelation::Tenant.name());
        if !wants_tenant || items.is_empty() {
            return Ok(());
        }

        let ids: BTreeSet<i32> = items.iter().map(|item| item.tenant_id.value()).collect();
        let table = Tenant::fields().table();
        let mut writer = SqlWriter::new(format!(
            "SELECT * FROM {} WHERE {}.{} IN (",
            ident(table),
            ident(table),
            ident("id")
        ));
        for (i, id) in ids.into_iter().enumerate() {
            if i > 0 {
                writer.push(", ");
            }
            writer.bind(Literal::from(id));
        }
        writer.push(")");
        let statement = writer.finish();

        let tenants = statement
            .query()
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(Tenant::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        for item in items.iter_mut() {
            item.tenant = tenants.iter().find(|t| t.id == item.tenant_id).cloned();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn sensitive_datum_values_cover_every_column() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut datum = SensitiveDatum::new(SensitiveDatumType::Email, "Email", TenantId::new(2))
            .with_content("a@b.c");
        datum.audit = AuditFields::created_by("System", at);

        let values = datum.values();
        let names: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            [
                "type",
                "name",
                "content",
                "tenant_id",
                "track_creation_user",
                "track_creation_time",
                "track_last_write_user",
                "track_last_write_time"
            ]
        );
        assert_eq!(values[0].1, Literal::Integer(1));
        assert_eq!(values[3].1, Literal::Integer(2));
        assert_eq!(values[5].1, Literal::Timestamp(at));
    }

    #[test]
    fn generated_key_only_for_new_rows() {
        let datum = SensitiveDatum::new(SensitiveDatumType::Name, "Nom", TenantId::new(1));
        assert!(datum.key_is_generated());
        assert!(!datum.with_identifier(7).key_is_generated());
        assert!(!Tenant::new(TenantId::new(1), "Locataire 1").key_is_generated());
    }

    #[test]
    fn key_field_resolves() {
        assert_eq!(key_field::<SensitiveDatum>().unwrap().column(), "id");
        assert_eq!(key_field::<Tenant>().unwrap().column(), "id");
    }
}
