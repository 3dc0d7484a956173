//! Command implementations for the mealctl CLI

pub mod discard;
pub mod keys;
pub mod migrate;
pub mod query;

use anyhow::{Context, Result};
use clap::ValueEnum;
use mealctl_core::db;
use mealctl_core::MealctlConfig;
use mealctl_core::db::PgPool;

// Re-export dispatcher functions for flat access from main.rs
pub use discard::run_discard;
pub use keys::run_keys;
pub use migrate::run_migrate;
pub use query::{run_count, run_explain, run_query};

/// Entities reachable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Client,
    Menu,
    Meal,
    Recipe,
    Product,
}

/// Run `$body` with `$E` bound to the record type of `$kind`.
macro_rules! for_entity {
    ($kind:expr, |$E:ident| $body:expr) => {
        match $kind {
            $crate::commands::EntityKind::Client => {
                type $E = mealctl_core::entities::Client;
                $body
            }
            $crate::commands::EntityKind::Menu => {
                type $E = mealctl_core::entities::Menu;
                $body
            }
            $crate::commands::EntityKind::Meal => {
                type $E = mealctl_core::entities::Meal;
                $body
            }
            $crate::commands::EntityKind::Recipe => {
                type $E = mealctl_core::entities::Recipe;
                $body
            }
            $crate::commands::EntityKind::Product => {
                type $E = mealctl_core::entities::Product;
                $body
            }
        }
    };
}
pub(crate) use for_entity;

pub(crate) async fn connect(config: &MealctlConfig) -> Result<PgPool> {
    db::connect(&config.database)
        .await
        .context("Failed to connect to database (set DATABASE_URL or ~/.mealctl/config.toml)")
}
