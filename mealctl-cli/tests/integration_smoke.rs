//! Smoke tests to verify command wiring
//!
//! None of these touch a database: `explain`, `keys`, `--sql-only` and
//! `--help` all run offline.

use assert_cmd::Command;
use predicates::prelude::*;

fn mealctl() -> Command {
    let mut cmd = Command::cargo_bin("mealctl").unwrap();
    // keep a developer's config and .env out of the picture
    let home = tempfile::tempdir().unwrap();
    cmd.env("HOME", home.path())
        .env_remove("DATABASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

// === Help ===

#[test]
fn test_help_lists_commands() {
    mealctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("explain"));
}

#[test]
fn test_query_help() {
    mealctl()
        .args(["query", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("KEY=VALUE"));
}

// === Explain ===

#[test]
fn test_explain_root_filter() {
    mealctl()
        .args(["explain", "meal", "-f", "total_time_lte=30"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "SELECT meals.* FROM meals WHERE meals.total_time <= $1 AND meals.discarded = $2",
        ));
}

#[test]
fn test_explain_deduplicates_joins() {
    mealctl()
        .args([
            "explain",
            "meal",
            "-f",
            "recipe_name=dal",
            "-f",
            "product_name=lentils",
            "-f",
            "ingredient_name_ne=salt",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("SELECT DISTINCT meals.*"))
        .stdout(predicate::str::contains("JOIN recipes ON").count(1))
        .stdout(predicate::str::contains("JOIN ingredients ON").count(1));
}

#[test]
fn test_explain_with_tags_and_paging() {
    mealctl()
        .args(["explain", "recipe", "--tag", "diet::vegan", "--sort", "-name", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXISTS (SELECT 1 FROM recipe_tags tg"))
        .stdout(predicate::str::contains("ORDER BY recipes.name DESC NULLS LAST, recipes.id ASC LIMIT"));
}

#[test]
fn test_query_sql_only() {
    mealctl()
        .args(["query", "product", "--sql-only", "-f", "brand_name=acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("JOIN brands AS brand ON brand.id = products.brand_id"));
}

#[test]
fn test_count_sql_only() {
    mealctl()
        .args(["count", "client", "--sql-only", "-f", "menu_author_id=n1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SELECT COUNT(DISTINCT clients.id) FROM clients"));
}

// === Errors ===

#[test]
fn test_unknown_key_fails() {
    mealctl()
        .args(["explain", "meal", "-f", "colour=red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown filter key 'colour'"));
}

#[test]
fn test_sort_on_joined_column_fails() {
    mealctl()
        .args(["explain", "meal", "--sort", "recipe_name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot sort by 'recipe_name'"));
}

#[test]
fn test_products_reject_tags() {
    mealctl()
        .args(["explain", "product", "--tag", "diet::vegan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown filter key 'tags'"));
}

// === Keys / completions ===

#[test]
fn test_keys_lists_joined_columns() {
    mealctl()
        .args(["keys", "meal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recipe_name"))
        .stdout(predicate::str::contains("_not_in"))
        .stdout(predicate::str::contains("tags_not_exists"));
}

#[test]
fn test_completions_bash() {
    mealctl()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mealctl"));
}
