//! Value types validated at construction
//!
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod name;
pub mod tag;
pub mod pagination;

pub use validation::ValidationError;
pub use name::EntityName;
pub use tag::Tag;
pub use pagination::{Paginated, Pagination};
