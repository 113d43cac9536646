//! Declarative filter criteria

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of comparisons a filter criterion can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterPredicate {
    Equal,
    DoesNotEqual,
    Contains,
    StartsWith,
    EndsWith,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
}

impl FilterPredicate {
    /// Every predicate, in declaration order
    pub const ALL: [Self; 10] = [
        Self::Equal,
        Self::DoesNotEqual,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::In,
    ];

    /// Predicates that compare the column's text form
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }

    /// Predicates that order values
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual
        )
    }

    /// Predicate name as it appears on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "Equal",
            Self::DoesNotEqual => "DoesNotEqual",
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::In => "In",
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a criterion joins the expression accumulated before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    And,
    Or,
}

/// One `(field, predicate, value-or-values)` filter
///
/// `predicate` defaults to [`FilterPredicate::Contains`] and `operator` to
/// [`FilterOperator::And`] when omitted. `value` feeds every predicate except
/// [`FilterPredicate::In`], which reads `values`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<FilterOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<FilterPredicate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

impl FilterCriteria {
    /// Create a single-value criterion
    pub fn new(
        field_name: impl Into<String>,
        predicate: FilterPredicate,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            operator: None,
            predicate: Some(predicate),
            value: Some(value.into()),
            values: None,
        }
    }

    /// Create an `In` criterion over a list of values
    pub fn any_of<V: Into<Value>>(
        field_name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            operator: None,
            predicate: Some(FilterPredicate::In),
            value: None,
            values: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Set the join operator
    #[must_use]
    pub const fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Shorthand for `with_operator(FilterOperator::Or)`
    #[must_use]
    pub const fn or(self) -> Self {
        self.with_operator(FilterOperator::Or)
    }

    /// Predicate to apply, defaulting to `Contains`
    #[must_use]
    pub fn effective_predicate(&self) -> FilterPredicate {
        self.predicate.unwrap_or(FilterPredicate::Contains)
    }

    /// Operator to join with, defaulting to `And`
    #[must_use]
    pub fn effective_operator(&self) -> FilterOperator {
        self.operator.unwrap_or_default()
    }
}
