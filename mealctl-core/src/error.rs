//! Structured error types for mealctl-core.
//!
//! Library callers get `RepoError`; the binary wraps it with `anyhow`.

use thiserror::Error;

use crate::filter::FilterOperator;

/// Errors raised while turning a filter dictionary into SQL.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Key is neither a mapped column nor a reserved key
    #[error("unknown filter key '{key}'")]
    UnknownKey { key: String },

    /// Value cannot be used with the key's column or operator
    #[error("invalid value for filter key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// Operator does not accept this kind of operand
    #[error("operator {operator} cannot be applied to {operand} (key '{key}')")]
    UnsupportedOperator {
        key: String,
        operator: FilterOperator,
        operand: &'static str,
    },

    /// Sort key is unknown or not on the root table
    #[error("cannot sort by '{key}': {reason}")]
    InvalidSort { key: String, reason: &'static str },
}

impl FilterError {
    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(key: impl Into<String>, operator: FilterOperator, operand: &'static str) -> Self {
        Self::UnsupportedOperator {
            key: key.into(),
            operator,
            operand,
        }
    }

    pub fn invalid_sort(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSort {
            key: key.into(),
            reason,
        }
    }
}

/// Main error type for repository operations
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// Optimistic lock failure: the stored row moved past the caller's version
    #[error("conflict: {resource} '{id}' is no longer at version {expected_version}")]
    Conflict {
        resource: &'static str,
        id: String,
        expected_version: i32,
    },

    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Mixin operation on an entity that does not carry the mixin
    #[error("{operation} is not supported for {resource}")]
    Unsupported {
        resource: &'static str,
        operation: &'static str,
    },

    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn unsupported(resource: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { resource, operation }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// True for errors caused by caller input rather than the database.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::Filter(_)
                | Self::Unsupported { .. }
        )
    }
}
