//! Validation error types

use std::fmt;

/// Validation error for value types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format
    InvalidFormat { field: &'static str, reason: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
