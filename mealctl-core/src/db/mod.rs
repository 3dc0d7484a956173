//! Database layer - connection pool and schema migrations
//!
//! Filtered reads go through `repo::Repository`; this module only owns
//! connections and DDL.

pub mod migrations;
pub mod pool;

pub use pool::{connect, create_pool, create_pool_with_options};
pub use sqlx::PgPool;
