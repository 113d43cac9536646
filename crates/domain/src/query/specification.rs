//! Storage-independent description of one query
//!
//! A [`QuerySpecification`] accumulates a filter predicate, an ordered sort
//! list, eager-load hints and an optional paging window. Every field name is
//! resolved against the entity's registry as it is added, so a bad name fails
//! while the specification is built rather than when it runs.
//!
//! # Examples
//!
//! ```
//! use domain::query::{GridCriteria, QuerySpecification, SortCriteria, FilterCriteria, FilterPredicate};
//! use domain::SensitiveDatum;
//!
//! let grid = GridCriteria::page(1, 2)
//!     .with_filter(FilterCriteria::new("Type", FilterPredicate::Equal, "Email"))
//!     .with_sort(SortCriteria::ascending("Name"));
//! let spec = QuerySpecification::<SensitiveDatum>::new().apply_criteria(&grid).unwrap();
//!
//! assert_eq!(spec.skip(), 2);
//! assert_eq!(spec.take(), Some(2));
//! // Identifier is appended as the paging tie-break
//! assert_eq!(spec.effective_order().len(), 2);
//! ```

use std::fmt;

use serde_json::Value;

use super::{
    FieldPath, GridCriteria, Predicate, QueryBuilder, SortCriteria, SortDirection,
};
use crate::{
    DomainError,
    entities::{Entity, RelationKey},
    tenant::{TenantContext, TenantFilter},
};

/// One resolved sort key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: FieldPath,
    pub direction: SortDirection,
}

/// Filter, sort, include and paging intent for entity `E`
pub struct QuerySpecification<E> {
    criteria: Option<Predicate<E>>,
    order_by: Vec<SortKey>,
    includes: Vec<&'static str>,
    skip: u64,
    take: Option<u64>,
}

impl<E: Entity> QuerySpecification<E> {
    pub const fn new() -> Self {
        Self {
            criteria: None,
            order_by: Vec::new(),
            includes: Vec::new(),
            skip: 0,
            take: None,
        }
    }

    /// Specification filtered by `predicate`
    pub fn with_criteria(predicate: Predicate<E>) -> Self {
        let mut spec = Self::new();
        spec.criteria = Some(predicate);
        spec
    }

    /// Replace the filter predicate
    pub fn set_criteria(&mut self, predicate: Option<Predicate<E>>) {
        self.criteria = predicate;
    }

    /// AND `predicate` onto the current filter
    #[must_use]
    pub fn and_criteria(mut self, predicate: Predicate<E>) -> Self {
        self.criteria = Some(match self.criteria.take() {
            Some(current) => current.and(predicate),
            None => predicate,
        });
        self
    }

    /// Append a sort key; the first key is primary, later ones break ties
    ///
    /// # Errors
    ///
    /// Unknown fields, nested paths and fields not declared sortable.
    pub fn add_sort(mut self, field: &str, direction: SortDirection) -> Result<Self, DomainError> {
        let path = E::fields().resolve(field)?;
        if path.is_nested() || !path.field().is_sortable() {
            return Err(DomainError::NotSortable(path.path().to_string()));
        }
        self.order_by.push(SortKey {
            field: path,
            direction,
        });
        Ok(self)
    }

    pub fn apply_order_by(self, field: &str) -> Result<Self, DomainError> {
        self.add_sort(field, SortDirection::Ascending)
    }

    pub fn apply_order_by_descending(self, field: &str) -> Result<Self, DomainError> {
        self.add_sort(field, SortDirection::Descending)
    }

    /// Eager-load a relation
    #[must_use]
    pub fn add_include(mut self, relation: E::Relation) -> Self {
        self.push_include(relation.name());
        self
    }

    /// Eager-load a relation given by name
    ///
    /// # Errors
    ///
    /// [`DomainError::UnknownRelation`] when `E` has no such relation.
    pub fn add_include_path(mut self, relation: &str) -> Result<Self, DomainError> {
        let registry = E::fields();
        let descriptor = registry
            .relation(relation)
            .ok_or_else(|| DomainError::UnknownRelation {
                entity: registry.entity().to_string(),
                relation: relation.to_string(),
            })?;
        self.push_include(descriptor.name);
        Ok(self)
    }

    fn push_include(&mut self, name: &'static str) {
        if !self.includes.contains(&name) {
            self.includes.push(name);
        }
    }

    /// Enable paging with `skip = page_index * page_size`, `take = page_size`
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidPaging`] for negative input or an overflowing window.
    pub fn apply_paging(mut self, page_index: i64, page_size: i64) -> Result<Self, DomainError> {
        let page = u64::try_from(page_index)
            .map_err(|_| DomainError::InvalidPaging(format!("page {page_index} is negative")))?;
        let size = u64::try_from(page_size).map_err(|_| {
            DomainError::InvalidPaging(format!("page size {page_size} is negative"))
        })?;
        let skip = page
            .checked_mul(size)
            .filter(|skip| i64::try_from(*skip).is_ok())
            .ok_or_else(|| DomainError::InvalidPaging("paging window overflows".to_string()))?;

        self.skip = skip;
        self.take = Some(size);
        Ok(self)
    }

    /// Replace the filter with the grid's filters, add its sorts and page it
    ///
    /// Paging applies only when `page_size` is positive; a negative `page`
    /// is rejected either way.
    pub fn apply_criteria(self, grid: &GridCriteria) -> Result<Self, DomainError> {
        let page = grid.page.unwrap_or(0);
        if page < 0 {
            return Err(DomainError::InvalidPaging(format!("page {page} is negative")));
        }
        let spec = self.apply_criteria_without_paging(grid)?;
        match grid.page_size {
            Some(size) if size > 0 => spec.apply_paging(page, size),
            Some(size) if size < 0 => Err(DomainError::InvalidPaging(format!(
                "page size {size} is negative"
            ))),
            _ => Ok(spec),
        }
    }

    /// Same as [`apply_criteria`](Self::apply_criteria) without the window
    pub fn apply_criteria_without_paging(self, grid: &GridCriteria) -> Result<Self, DomainError> {
        self.apply_filter(grid)?
            .apply_ordering(&grid.sorts, grid.has_paging())
    }

    /// Replace the filter with the grid's filters
    pub fn apply_filter(mut self, grid: &GridCriteria) -> Result<Self, DomainError> {
        self.criteria = QueryBuilder::get_criteria(&grid.filters)?;
        Ok(self)
    }

    /// Replace the filter with a global search plus alias filters
    pub fn apply_filter_search(
        mut self,
        global_search: Option<&str>,
        filters: &[(String, Vec<Value>)],
    ) -> Result<Self, DomainError> {
        let criteria = QueryBuilder::get_filters::<E>(global_search, filters);
        self.criteria = QueryBuilder::get_criteria(&criteria)?;
        Ok(self)
    }

    /// Sort by every field whose sort alias or group is `column`
    pub fn apply_sorting(
        self,
        column: Option<&str>,
        descending: bool,
        has_paging: bool,
    ) -> Result<Self, DomainError> {
        let sorts = QueryBuilder::get_sorts::<E>(column, descending);
        self.apply_ordering(&sorts, has_paging)
    }

    /// Global search, alias filters, alias sorting and paging in one call
    pub fn apply_search_criteria(
        self,
        filters: &[(String, Vec<Value>)],
        global_search: Option<&str>,
        sort_column: Option<&str>,
        descending: bool,
        page: i64,
        page_size: i64,
    ) -> Result<Self, DomainError> {
        let spec = self
            .apply_filter_search(global_search, filters)?
            .apply_sorting(sort_column, descending, page_size > 0)?;
        if page_size > 0 || page < 0 || page_size < 0 {
            spec.apply_paging(page, page_size)
        } else {
            Ok(spec)
        }
    }

    fn apply_ordering(mut self, sorts: &[SortCriteria], has_paging: bool) -> Result<Self, DomainError> {
        for sort in sorts {
            self = self.add_sort(&sort.field_name, sort.direction)?;
        }
        if has_paging {
            self.order_by = self.effective_order_inner(true);
        }
        Ok(self)
    }

    pub const fn criteria(&self) -> Option<&Predicate<E>> {
        self.criteria.as_ref()
    }

    /// Sort keys in the order they were added
    pub fn order_by(&self) -> &[SortKey] {
        &self.order_by
    }

    pub fn includes(&self) -> &[&'static str] {
        &self.includes
    }

    pub const fn skip(&self) -> u64 {
        self.skip
    }

    pub const fn take(&self) -> Option<u64> {
        self.take
    }

    pub const fn is_paging_enabled(&self) -> bool {
        self.take.is_some()
    }

    /// Sort keys to execute
    ///
    /// When paging is enabled the registry's paging-order fields are
    /// appended ascending, skipping any already present, so page
    /// boundaries are stable across calls.
    pub fn effective_order(&self) -> Vec<SortKey> {
        self.effective_order_inner(self.is_paging_enabled())
    }

    fn effective_order_inner(&self, paging: bool) -> Vec<SortKey> {
        let mut order = self.order_by.clone();
        if paging {
            let registry = E::fields();
            for field in registry.paging_fields() {
                if order.iter().any(|key| key.field.field().name() == field.name()) {
                    continue;
                }
                if let Ok(path) = registry.resolve(field.name()) {
                    order.push(SortKey {
                        field: path,
                        direction: SortDirection::Ascending,
                    });
                }
            }
        }
        order
    }

    /// Copy without the paging window, for counting every match
    #[must_use]
    pub fn without_paging(&self) -> Self {
        let mut spec = self.clone();
        spec.skip = 0;
        spec.take = None;
        spec
    }
}

impl<E: Entity> Default for QuerySpecification<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for QuerySpecification<E> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            order_by: self.order_by.clone(),
            includes: self.includes.clone(),
            skip: self.skip,
            take: self.take,
        }
    }
}

impl<E> fmt::Debug for QuerySpecification<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpecification")
            .field("criteria", &self.criteria)
            .field("order_by", &self.order_by)
            .field("includes", &self.includes)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .finish()
    }
}

impl<E: Entity> TenantFilter for QuerySpecification<E> {
    type Output = Result<Self, DomainError>;

    /// AND the tenant equality in front of the caller's predicate
    fn with_tenant(&self, context: &TenantContext) -> Self::Output {
        let mut spec = self.clone();
        if let Some(scope) = Predicate::tenant_scope(context.tenant_id())? {
            spec.criteria = Some(match spec.criteria.take() {
                Some(current) => scope.and(current),
                None => scope,
            });
        }
        Ok(spec)
    }
}
