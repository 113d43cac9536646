//! Query specification model
//!
//! - [`FilterCriteria`], [`SortCriteria`], [`GridCriteria`] - declarative caller input
//! - [`FieldRegistry`] - per-entity field capabilities
//! - [`Predicate`] - validated boolean expression over an entity's fields
//! - [`QueryBuilder`] - criteria → predicates/sorts translation
//! - [`QuerySpecification`] - filter + sort + includes + paging for one query

mod builder;
mod fields;
mod filter;
mod grid;
mod literal;
mod predicate;
mod sort;
mod specification;

pub use builder::QueryBuilder;
pub use fields::{
    FieldDescriptor, FieldKind, FieldPath, FieldRegistry, FieldRegistryBuilder, FilterCapability,
    RelationDescriptor, SortCapability, audit_fields,
};
pub use filter::{FilterCriteria, FilterOperator, FilterPredicate};
pub use grid::{GridCriteria, GridPage};
pub use literal::Literal;
pub use predicate::{Comparison, Expr, Predicate, TextMatch};
pub use sort::{SortCriteria, SortDirection};
pub use specification::{QuerySpecification, SortKey};
