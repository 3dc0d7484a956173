//! Filter → SQL rendering

pub mod select;
pub mod sort;

use serde::{Deserialize, Serialize};

pub use select::{Predicate, SelectBuilder};
pub use sort::{SortDirection, SortKey};

pub const DEFAULT_MAX_LIMIT: u64 = 500;

/// Paging bounds, the `[query]` section of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Applied when a filter has no `limit`. `None` means unbounded.
    pub default_limit: Option<u64>,
    pub max_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: None,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl QueryConfig {
    /// Limit to render for a requested `limit`.
    pub fn effective_limit(&self, requested: Option<u64>) -> Option<u64> {
        requested
            .or(self.default_limit)
            .map(|n| n.min(self.max_limit))
    }
}
