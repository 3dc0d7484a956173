//! `migrate`: create tables and indexes

use anyhow::{Context, Result};
use mealctl_core::db::migrations;
use mealctl_core::MealctlConfig;

use super::connect;

pub async fn run_migrate(config: &MealctlConfig) -> Result<()> {
    let pool = connect(config).await?;
    migrations::run(&pool).await.context("Migrations failed")?;
    println!("migrations complete");
    Ok(())
}
