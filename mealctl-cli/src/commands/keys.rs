//! `keys`: list the filter keys an entity accepts

use anyhow::Result;
use clap::Parser;
use mealctl_core::filter::{FilterOperator, DISCARDED, RESERVED_KEYS, TAGS, TAGS_NOT_EXISTS};
use mealctl_core::Entity;

use super::{for_entity, EntityKind};

#[derive(Parser, Debug)]
pub struct KeysArgs {
    /// Entity type
    #[arg(value_enum)]
    pub entity: EntityKind,
}

const OPERATORS: &[FilterOperator] = &[
    FilterOperator::Ne,
    FilterOperator::Gt,
    FilterOperator::Gte,
    FilterOperator::Lt,
    FilterOperator::Lte,
    FilterOperator::NotIn,
    FilterOperator::IsNot,
];

pub fn run_keys(args: KeysArgs) -> Result<()> {
    let (keys, tagged, soft_delete) = for_entity!(args.entity, |E| {
        let keys: Vec<_> = E::schema().keys().collect();
        (keys, E::TAGS.is_some(), E::SOFT_DELETE)
    });

    println!("{:<24} {:<12} TYPE", "KEY", "TABLE");
    for (key, table, ty) in keys {
        println!("{:<24} {:<12} {}", key, table, ty);
    }

    let postfixes: Vec<_> = OPERATORS.iter().map(|op| op.postfix()).collect();
    println!();
    println!("postfixes: {}", postfixes.join(" "));

    let reserved: Vec<_> = RESERVED_KEYS
        .iter()
        .filter(|k| match **k {
            TAGS | TAGS_NOT_EXISTS => tagged,
            DISCARDED => soft_delete,
            _ => true,
        })
        .copied()
        .collect();
    println!("reserved: {}", reserved.join(" "));
    Ok(())
}
