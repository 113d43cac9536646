//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// A field name does not exist in the entity's field registry
    #[error("Unknown field '{field}' on {entity}")]
    UnknownField { entity: String, field: String },

    /// A relation name does not exist in the entity's field registry
    #[error("Unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: String, relation: String },

    /// The field does not accept the requested filter predicate
    #[error("Predicate {predicate} is not supported on field '{field}'")]
    UnsupportedPredicate { field: String, predicate: String },

    /// The field exists but is not declared sortable
    #[error("Field '{0}' is not sortable")]
    NotSortable(String),

    /// A literal could not be converted to the field's type
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Negative or otherwise unusable paging window
    #[error("Invalid paging: {0}")]
    InvalidPaging(String),

    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Operation not permitted
    #[error("Operation not permitted: {0}")]
    NotPermitted(String),
}

impl DomainError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create an unknown field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
