//! Page-based access on top of the `limit`/`skip` filter keys

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_PER_PAGE: u32 = 100;

const DEFAULT_PER_PAGE: u32 = 20;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Page is clamped to a minimum of 1, per page to 1..=100.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Value for the `skip` filter key.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Value for the `limit` filter key.
    pub fn limit(&self) -> u32 {
        self.per_page
    }

    /// Wrap one page of results.
    pub fn wrap<T>(&self, items: Vec<T>, total: i64) -> Paginated<T> {
        Paginated {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    pub fn total_pages(&self) -> u32 {
        if self.total <= 0 {
            return 1;
        }
        let total = self.total as u64;
        let per_page = u64::from(self.per_page);
        total.div_ceil(per_page).max(1) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Map items while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
