//! `discard`: soft-delete one row

use anyhow::{Context, Result};
use clap::Parser;
use mealctl_core::{MealctlConfig, Repository};
use uuid::Uuid;

use super::{connect, for_entity, EntityKind};

#[derive(Parser, Debug)]
pub struct DiscardArgs {
    /// Entity type
    #[arg(value_enum)]
    pub entity: EntityKind,

    /// Row id
    pub id: Uuid,
}

pub async fn run_discard(args: DiscardArgs, config: &MealctlConfig) -> Result<()> {
    let pool = connect(config).await?;

    for_entity!(args.entity, |E| {
        Repository::<E>::new(&pool)
            .discard(args.id)
            .await
            .with_context(|| format!("Failed to discard {:?} {}", args.entity, args.id))?
    });

    println!("discarded {}", args.id);
    Ok(())
}
