//! Typed predicate trees built from runtime field names
//!
//! A [`Predicate<E>`] is a small boolean expression over the fields of entity
//! `E`. Every leaf has been validated against `E`'s [`FieldRegistry`]: the
//! field exists, accepts the requested comparison and the literal has been
//! coerced to the field's storage type. Storage adapters compile the
//! [`Expr`] tree; nothing here knows about SQL.
//!
//! [`FieldRegistry`]: super::FieldRegistry

use std::{fmt, marker::PhantomData};

use serde_json::Value;

use super::{FieldPath, FilterCriteria, FilterOperator, FilterPredicate, Literal};
use crate::{DomainError, TenantId, entities::Entity};

/// Value comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Comparisons against the text form of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Contains,
    StartsWith,
    EndsWith,
}

/// Untyped expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        field: FieldPath,
        op: Comparison,
        value: Literal,
    },
    Text {
        field: FieldPath,
        op: TextMatch,
        value: String,
    },
    In {
        field: FieldPath,
        values: Vec<Literal>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Number of leaf comparisons in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::And(l, r) | Self::Or(l, r) => l.leaf_count() + r.leaf_count(),
            _ => 1,
        }
    }
}

/// Validated filter over the fields of `E`
pub struct Predicate<E> {
    expr: Expr,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Predicate<E> {
    fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _entity: PhantomData,
        }
    }

    /// Build a leaf from a declarative criterion
    ///
    /// # Errors
    ///
    /// - [`DomainError::UnknownField`] / [`DomainError::UnknownRelation`] for a bad path
    /// - [`DomainError::UnsupportedPredicate`] when the field does not accept the predicate
    /// - [`DomainError::InvalidValue`] when the value cannot be coerced
    pub fn build(criteria: &FilterCriteria) -> Result<Self, DomainError> {
        let predicate = criteria.effective_predicate();
        let path = Self::resolve_for(&criteria.field_name, predicate)?;

        if predicate == FilterPredicate::In {
            let values = criteria.values.as_deref().unwrap_or_default();
            return Self::coerce_list(path, values);
        }

        let value = criteria.value.as_ref().unwrap_or(&Value::Null);
        Self::leaf(path, predicate, value)
    }

    /// Build a single comparison from a JSON value
    ///
    /// # Errors
    ///
    /// Same as [`Predicate::build`].
    pub fn compare(field: &str, predicate: FilterPredicate, value: &Value) -> Result<Self, DomainError> {
        let path = Self::resolve_for(field, predicate)?;
        if predicate == FilterPredicate::In {
            return match value {
                Value::Array(values) => Self::coerce_list(path, values),
                other => Self::coerce_list(path, std::slice::from_ref(other)),
            };
        }
        Self::leaf(path, predicate, value)
    }

    /// Equality against an already typed literal
    ///
    /// # Examples
    ///
    /// ```
    /// use domain::query::Predicate;
    /// use domain::{SensitiveDatum, SensitiveDatumType};
    ///
    /// let by_type = Predicate::<SensitiveDatum>::equal("Type", SensitiveDatumType::Email).unwrap();
    /// assert_eq!(by_type.expr().leaf_count(), 1);
    /// ```
    pub fn equal(field: &str, value: impl Into<Literal>) -> Result<Self, DomainError> {
        let path = Self::resolve_for(field, FilterPredicate::Equal)?;
        Ok(Self::from_expr(Expr::Compare {
            field: path,
            op: Comparison::Equal,
            value: value.into(),
        }))
    }

    /// Membership in a list of already typed literals
    pub fn any_of<V: Into<Literal>>(
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, DomainError> {
        let path = Self::resolve_for(field, FilterPredicate::In)?;
        let values: Vec<Literal> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(DomainError::invalid_value(path.path(), "In requires at least one value"));
        }
        Ok(Self::from_expr(Expr::In { field: path, values }))
    }

    /// Equality on the entity's tenant field, or `None` for unscoped entities
    ///
    /// # Errors
    ///
    /// Fails only when the registry names a tenant field it does not declare.
    pub fn tenant_scope(tenant_id: TenantId) -> Result<Option<Self>, DomainError> {
        E::fields()
            .tenant_field()
            .map(|field| Self::equal(field.name(), tenant_id))
            .transpose()
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::from_expr(Expr::And(Box::new(self.expr), Box::new(other.expr)))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::from_expr(Expr::Or(Box::new(self.expr), Box::new(other.expr)))
    }

    /// Join `other` onto `self` with the given operator
    #[must_use]
    pub fn combine(self, operator: FilterOperator, other: Self) -> Self {
        match operator {
            FilterOperator::And => self.and(other),
            FilterOperator::Or => self.or(other),
        }
    }

    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    fn resolve_for(field: &str, predicate: FilterPredicate) -> Result<FieldPath, DomainError> {
        let path = E::fields().resolve(field)?;
        if path.field().supports(predicate) {
            Ok(path)
        } else {
            Err(DomainError::UnsupportedPredicate {
                field: path.path().to_string(),
                predicate: predicate.to_string(),
            })
        }
    }

    fn leaf(path: FieldPath, predicate: FilterPredicate, value: &Value) -> Result<Self, DomainError> {
        let text_op = match predicate {
            FilterPredicate::Contains => Some(TextMatch::Contains),
            FilterPredicate::StartsWith => Some(TextMatch::StartsWith),
            FilterPredicate::EndsWith => Some(TextMatch::EndsWith),
            _ => None,
        };
        if let Some(op) = text_op {
            let value = match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(Self::from_expr(Expr::Text {
                field: path,
                op,
                value,
            }));
        }

        let op = match predicate {
            FilterPredicate::DoesNotEqual => Comparison::NotEqual,
            FilterPredicate::LessThan => Comparison::LessThan,
            FilterPredicate::LessThanOrEqual => Comparison::LessThanOrEqual,
            FilterPredicate::GreaterThan => Comparison::GreaterThan,
            FilterPredicate::GreaterThanOrEqual => Comparison::GreaterThanOrEqual,
            _ => Comparison::Equal,
        };
        let literal = path.field().kind().coerce(path.path(), value)?;
        if literal.is_null() && predicate.is_ordering() {
            return Err(DomainError::invalid_value(
                path.path(),
                format!("null cannot be used with {predicate}"),
            ));
        }
        Ok(Self::from_expr(Expr::Compare {
            field: path,
            op,
            value: literal,
        }))
    }

    fn coerce_list(path: FieldPath, values: &[Value]) -> Result<Self, DomainError> {
        if values.is_empty() {
            return Err(DomainError::invalid_value(path.path(), "In requires at least one value"));
        }
        let kind = path.field().kind();
        let literals = values
            .iter()
            .map(|v| match kind.coerce(path.path(), v)? {
                Literal::Null => Err(DomainError::invalid_value(path.path(), "In does not accept null")),
                literal => Ok(literal),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_expr(Expr::In {
            field: path,
            values: literals,
        }))
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> PartialEq for Predicate<E> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}
