use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{ColumnSpec, ColumnType, FilterColumnMapper, FilterSchema, FilterValue, Join};
use crate::models::EntityName;
use crate::repo::{Audit, Entity, TagTable};

pub const INGREDIENTS: Join = Join::many("ingredients", "ingredients", "ingredients.recipe_id = recipes.id");
pub const INGREDIENT_PRODUCTS: Join = Join::one("products", "products", "products.id = ingredients.product_id");

pub(crate) const INGREDIENT_COLUMNS: &[(&str, ColumnSpec)] = &[
    ("ingredient_name", ColumnSpec::new("name", ColumnType::Text)),
    ("ingredient_quantity", ColumnSpec::new("quantity", ColumnType::Float)),
    ("products", ColumnSpec::new("product_id", ColumnType::Uuid)),
];

pub(crate) const PRODUCT_COLUMNS: &[(&str, ColumnSpec)] = &[
    ("product_name", ColumnSpec::new("name", ColumnType::Text)),
    ("product_barcode", ColumnSpec::new("barcode", ColumnType::Text)),
    ("product_is_food", ColumnSpec::new("is_food", ColumnType::Bool)),
];

const COLUMNS: &[(&str, ColumnSpec)] = &[
    ("id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("meal_id", ColumnSpec::new("meal_id", ColumnType::Uuid)),
    ("name", ColumnSpec::new("name", ColumnType::Text)),
    ("author_id", ColumnSpec::new("author_id", ColumnType::Text)),
    ("total_time", ColumnSpec::new("total_time", ColumnType::Int)),
    ("privacy", ColumnSpec::new("privacy", ColumnType::Text)),
    ("created_at", ColumnSpec::new("created_at", ColumnType::Timestamp)),
    ("updated_at", ColumnSpec::new("updated_at", ColumnType::Timestamp)),
];

const MAPPERS: &[FilterColumnMapper] = &[
    FilterColumnMapper::root("recipes", COLUMNS),
    FilterColumnMapper::joined(INGREDIENT_COLUMNS, &[INGREDIENTS]),
    FilterColumnMapper::joined(PRODUCT_COLUMNS, &[INGREDIENTS, INGREDIENT_PRODUCTS]),
];

static SCHEMA: FilterSchema = FilterSchema::new(MAPPERS);

/// A recipe, always owned by a meal
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub name: String,
    pub author_id: String,
    pub total_time: Option<i64>,
    /// `public` or `private`
    pub privacy: String,
    pub discarded: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Recipe {
    pub fn new(meal_id: Uuid, name: EntityName, author_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            meal_id,
            name: name.into_string(),
            author_id: author_id.into(),
            total_time: None,
            privacy: "private".to_string(),
            discarded: false,
            audit: Audit::new(),
        }
    }
}

impl Entity for Recipe {
    const TABLE: &'static str = "recipes";
    const RESOURCE: &'static str = "recipe";
    const TAGS: Option<TagTable> = Some(TagTable::new("recipe_tags", "recipe_id"));

    fn schema() -> &'static FilterSchema {
        &SCHEMA
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i32 {
        self.audit.version
    }

    fn columns(&self) -> Vec<(&'static str, FilterValue)> {
        vec![
            ("meal_id", self.meal_id.into()),
            ("name", self.name.clone().into()),
            ("author_id", self.author_id.clone().into()),
            ("total_time", self.total_time.into()),
            ("privacy", self.privacy.clone().into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::query::QueryConfig;
    use crate::repo::explain;

    #[test]
    fn product_keys_join_through_ingredients() {
        let filter = Filter::new().with("product_is_food", true);
        let sql = explain::<Recipe>(&filter, &QueryConfig::default()).unwrap();
        assert_eq!(
            sql,
            "SELECT DISTINCT recipes.* FROM recipes \
             JOIN ingredients ON ingredients.recipe_id = recipes.id \
             JOIN products ON products.id = ingredients.product_id \
             WHERE products.is_food = $1 AND recipes.discarded = $2"
        );
    }

    #[test]
    fn new_recipe_is_unsaved() {
        let meal_id = Uuid::new_v4();
        let recipe = Recipe::new(meal_id, EntityName::new("Dal").unwrap(), "u1");
        assert_eq!(recipe.version(), 0);
        assert_eq!(recipe.meal_id, meal_id);
        assert_eq!(recipe.columns().len(), 5);
    }
}
