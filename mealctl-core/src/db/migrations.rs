//! Database migrations for the meal-planning tables
//!
//! Every statement is idempotent, so `run` is safe on every start.

use sqlx::PgPool;

use crate::error::Result;

/// Tables in creation order (parents first)
const TABLES: &[(&str, &str)] = &[
    (
        "clients",
        r#"
        CREATE TABLE IF NOT EXISTS clients (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            author_id TEXT NOT NULL,
            profile_name TEXT NOT NULL,
            onboarding_source TEXT,
            discarded BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "menus",
        r#"
        CREATE TABLE IF NOT EXISTS menus (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
            author_id TEXT NOT NULL,
            description TEXT,
            discarded BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "meals",
        r#"
        CREATE TABLE IF NOT EXISTS meals (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            author_id TEXT NOT NULL,
            menu_id UUID REFERENCES menus(id) ON DELETE SET NULL,
            total_time BIGINT,
            calorie_density DOUBLE PRECISION,
            weight_in_grams DOUBLE PRECISION,
            "like" BOOLEAN,
            discarded BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "menu_meals",
        r#"
        CREATE TABLE IF NOT EXISTS menu_meals (
            menu_id UUID NOT NULL REFERENCES menus(id) ON DELETE CASCADE,
            meal_id UUID NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            weekday TEXT NOT NULL,
            meal_type TEXT NOT NULL,
            PRIMARY KEY (menu_id, meal_id, weekday, meal_type)
        )
        "#,
    ),
    (
        "recipes",
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            meal_id UUID NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            author_id TEXT NOT NULL,
            total_time BIGINT,
            privacy TEXT NOT NULL DEFAULT 'private',
            discarded BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "brands",
        r#"
        CREATE TABLE IF NOT EXISTS brands (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "products",
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            brand_id UUID REFERENCES brands(id) ON DELETE SET NULL,
            barcode TEXT,
            is_food BOOLEAN,
            calories DOUBLE PRECISION,
            discarded BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    ),
    (
        "ingredients",
        r#"
        CREATE TABLE IF NOT EXISTS ingredients (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            recipe_id UUID NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            product_id UUID REFERENCES products(id) ON DELETE SET NULL,
            name TEXT NOT NULL,
            quantity DOUBLE PRECISION,
            unit TEXT,
            position BIGINT NOT NULL DEFAULT 0
        )
        "#,
    ),
];

/// `(tag table, owner column, owner table)`
const TAG_TABLES: &[(&str, &str, &str)] = &[
    ("client_tags", "client_id", "clients"),
    ("menu_tags", "menu_id", "menus"),
    ("meal_tags", "meal_id", "meals"),
    ("recipe_tags", "recipe_id", "recipes"),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_clients_author ON clients(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_menus_client ON menus(client_id)",
    "CREATE INDEX IF NOT EXISTS idx_meals_menu ON meals(menu_id)",
    "CREATE INDEX IF NOT EXISTS idx_meals_author ON meals(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_meals_active ON meals(id) WHERE discarded = FALSE",
    "CREATE INDEX IF NOT EXISTS idx_menu_meals_meal ON menu_meals(meal_id)",
    "CREATE INDEX IF NOT EXISTS idx_recipes_meal ON recipes(meal_id)",
    "CREATE INDEX IF NOT EXISTS idx_ingredients_recipe ON ingredients(recipe_id)",
    "CREATE INDEX IF NOT EXISTS idx_ingredients_product ON ingredients(product_id)",
    "CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand_id)",
    "CREATE INDEX IF NOT EXISTS idx_products_barcode ON products(barcode) WHERE barcode IS NOT NULL",
];

fn tag_table_ddl(table: &str, owner_column: &str, owner_table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            {owner_column} UUID NOT NULL REFERENCES {owner_table}(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            author_id TEXT,
            UNIQUE ({owner_column}, key, value, author_id)
        )"
    )
}

fn tag_index_ddl(table: &str, owner_column: &str) -> [String; 2] {
    [
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_owner ON {table}({owner_column})"),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_key_value ON {table}(key, value)"),
    ]
}

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<()> {
    tracing::info!("Running migrations...");

    for (name, ddl) in TABLES {
        tracing::debug!(table = name, "create table");
        sqlx::query(ddl).execute(pool).await?;
    }

    for (table, owner_column, owner_table) in TAG_TABLES {
        tracing::debug!(table, "create tag table");
        sqlx::query(&tag_table_ddl(table, owner_column, owner_table))
            .execute(pool)
            .await?;
    }

    create_indexes(pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}

async fn create_indexes(pool: &PgPool) -> Result<()> {
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    for (table, owner_column, _) in TAG_TABLES {
        for ddl in tag_index_ddl(table, owner_column) {
            sqlx::query(&ddl).execute(pool).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Client, Meal, Menu, Product, Recipe};
    use crate::repo::Entity;

    #[test]
    fn tag_tables_match_entities() {
        for table in [Client::TAGS, Menu::TAGS, Meal::TAGS, Recipe::TAGS].into_iter().flatten() {
            assert!(
                TAG_TABLES
                    .iter()
                    .any(|(t, owner, _)| *t == table.table && *owner == table.owner_column),
                "missing tag table {}",
                table.table
            );
        }
        assert!(Product::TAGS.is_none());
    }

    #[test]
    fn every_entity_table_is_created() {
        for table in [Client::TABLE, Menu::TABLE, Meal::TABLE, Recipe::TABLE, Product::TABLE] {
            assert!(TABLES.iter().any(|(name, _)| *name == table), "missing {}", table);
        }
    }

    #[test]
    fn tag_ddl_is_idempotent() {
        let ddl = tag_table_ddl("meal_tags", "meal_id", "meals");
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS meal_tags"));
        assert!(ddl.contains("REFERENCES meals(id)"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_run_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool creation failed");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
