use std::collections::HashSet;

use mealctl_core::entities::{Meal, Recipe};
use mealctl_core::filter::{Filter, FilterOperator, FilterValue};
use mealctl_core::query::QueryConfig;
use mealctl_core::repo::{explain, select, Entity};
use proptest::prelude::*;

/// Filter keys of the meal schema that take text operands
const MEAL_TEXT_KEYS: &[&str] = &[
    "name",
    "author_id",
    "recipe_name",
    "recipe_author_id",
    "recipe_privacy",
    "ingredient_name",
    "product_name",
    "product_barcode",
];

const POSTFIXES: &[&str] = &["", "_ne", "_gt", "_gte", "_lt", "_lte", "_not_in", "_is_not"];

fn arb_text_filter() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            prop::sample::select(MEAL_TEXT_KEYS),
            prop::sample::select(POSTFIXES),
            // marker prefix keeps generated values distinct from SQL text
            "[a-z0-9 ';\"-]{0,16}".prop_map(|s| format!("zzq{}", s)),
        )
            .prop_map(|(key, postfix, value)| (format!("{}{}", key, postfix), value)),
        0..8,
    )
}

proptest! {
    /// Property: key splitting never panics and the postfix round-trips
    #[test]
    fn prop_split_key_round_trips(key in "[a-z_]{0,24}") {
        let (base, op) = FilterOperator::split_key(&key);
        prop_assert_eq!(format!("{}{}", base, op.postfix()), key.clone());
        if op != FilterOperator::Eq {
            prop_assert!(!base.is_empty());
        }
    }

    /// Property: operands only ever reach SQL as bind parameters
    #[test]
    fn prop_values_never_inlined(entries in arb_text_filter()) {
        let filter: Filter = entries.iter().cloned().collect();
        let sql = explain::<Meal>(&filter, &QueryConfig::default()).unwrap();

        prop_assert!(!sql.contains("zzq"));
        prop_assert!(!sql.contains('\''));
    }

    /// Property: each join alias is emitted once, parents before children,
    /// and DISTINCT appears exactly when a to-many join does
    #[test]
    fn prop_joins_deduplicated(entries in arb_text_filter()) {
        let filter: Filter = entries.iter().cloned().collect();
        let builder = select::<Meal>(&filter, &QueryConfig::default()).unwrap();
        let aliases: Vec<_> = builder.joins().iter().map(|j| j.alias).collect();

        let unique: HashSet<_> = aliases.iter().collect();
        prop_assert_eq!(unique.len(), aliases.len());

        let position = |alias: &str| aliases.iter().position(|a| *a == alias);
        if let Some(ingredients) = position("ingredients") {
            prop_assert!(position("recipes").unwrap() < ingredients);
        }
        if let Some(products) = position("products") {
            prop_assert!(position("ingredients").unwrap() < products);
        }

        let sql = builder.to_sql().unwrap();
        prop_assert_eq!(sql.starts_with("SELECT DISTINCT"), builder.joins().iter().any(|j| j.many));
    }

    /// Property: limit never exceeds the configured maximum
    #[test]
    fn prop_limit_clamped(limit in 0u64..100_000, max in 1u64..1_000) {
        let config = QueryConfig { default_limit: None, max_limit: max };
        prop_assert!(config.effective_limit(Some(limit)).unwrap() <= max);
    }
}

#[test]
fn empty_in_list_matches_nothing() {
    let filter = Filter::new().with("id", FilterValue::List(vec![]));
    let sql = explain::<Recipe>(&filter, &QueryConfig::default()).unwrap();
    assert_eq!(
        sql,
        format!("SELECT {0}.* FROM {0} WHERE FALSE AND {0}.discarded = $1", Recipe::TABLE)
    );
}
