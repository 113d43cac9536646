//! Paging/sorting/filtering request and response shapes for data grids

use serde::{Deserialize, Serialize};

use super::{FilterCriteria, SortCriteria};

/// Caller-supplied grid request
///
/// Paging is applied only when `page_size` is positive; `page` is
/// zero-based.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridCriteria {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub filters: Vec<FilterCriteria>,
    #[serde(default)]
    pub sorts: Vec<SortCriteria>,
}

impl GridCriteria {
    /// Request one page with no filters or sorts
    pub const fn page(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            filters: Vec::new(),
            sorts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterCriteria) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortCriteria) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Whether the request asks for a paging window
    pub fn has_paging(&self) -> bool {
        self.page_size.is_some_and(|size| size > 0)
    }
}

/// One page of results plus the total count across all pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPage<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: u64,
}

impl<T> GridPage<T> {
    /// Convert the items, keeping paging information
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> GridPage<U> {
        GridPage {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }

    /// Number of pages needed for `total_count` items
    pub fn page_count(&self) -> u64 {
        match u64::try_from(self.page_size) {
            Ok(size) if size > 0 => self.total_count.div_ceil(size),
            _ => u64::from(self.total_count > 0),
        }
    }
}
