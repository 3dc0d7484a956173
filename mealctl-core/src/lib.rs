//! mealctl-core: filtering repository for the meal-planning store
//!
//! Filter dictionaries (`{"total_time_lte": 30, "recipe_name": "dal"}`)
//! are resolved against per-entity schemas, rendered into parameterized
//! PostgreSQL with deduplicated joins, and mapped back to records.

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod repo;

pub use config::MealctlConfig;
pub use error::{FilterError, RepoError, Result};
pub use filter::{Filter, FilterValue};
pub use repo::{Entity, Repository};
