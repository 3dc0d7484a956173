//! Meal: aggregate root of its recipes
//!
//! Meal filters reach three levels deep: recipes, their ingredients, and
//! the products those ingredients use.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::recipe::{Recipe, INGREDIENTS, INGREDIENT_COLUMNS, INGREDIENT_PRODUCTS, PRODUCT_COLUMNS};
use crate::error::Result;
use crate::filter::{ColumnSpec, ColumnType, Filter, FilterColumnMapper, FilterSchema, FilterValue, Join, SORT};
use crate::models::EntityName;
use crate::query::QueryConfig;
use crate::repo::{Audit, Entity, Repository, TagTable};

pub const RECIPES: Join = Join::many("recipes", "recipes", "recipes.meal_id = meals.id");

const COLUMNS: &[(&str, ColumnSpec)] = &[
    ("id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("name", ColumnSpec::new("name", ColumnType::Text)),
    ("author_id", ColumnSpec::new("author_id", ColumnType::Text)),
    ("menu_id", ColumnSpec::new("menu_id", ColumnType::Uuid)),
    ("total_time", ColumnSpec::new("total_time", ColumnType::Int)),
    ("calorie_density", ColumnSpec::new("calorie_density", ColumnType::Float)),
    ("weight_in_grams", ColumnSpec::new("weight_in_grams", ColumnType::Float)),
    // reserved word
    ("like", ColumnSpec::new("\"like\"", ColumnType::Bool)),
    ("created_at", ColumnSpec::new("created_at", ColumnType::Timestamp)),
    ("updated_at", ColumnSpec::new("updated_at", ColumnType::Timestamp)),
];

const RECIPE_COLUMNS: &[(&str, ColumnSpec)] = &[
    ("recipe_id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("recipe_name", ColumnSpec::new("name", ColumnType::Text)),
    ("recipe_author_id", ColumnSpec::new("author_id", ColumnType::Text)),
    ("recipe_total_time", ColumnSpec::new("total_time", ColumnType::Int)),
    ("recipe_privacy", ColumnSpec::new("privacy", ColumnType::Text)),
];

const MAPPERS: &[FilterColumnMapper] = &[
    FilterColumnMapper::root("meals", COLUMNS),
    FilterColumnMapper::joined(RECIPE_COLUMNS, &[RECIPES]),
    FilterColumnMapper::joined(INGREDIENT_COLUMNS, &[RECIPES, INGREDIENTS]),
    FilterColumnMapper::joined(PRODUCT_COLUMNS, &[RECIPES, INGREDIENTS, INGREDIENT_PRODUCTS]),
];

static SCHEMA: FilterSchema = FilterSchema::new(MAPPERS);

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub author_id: String,
    pub menu_id: Option<Uuid>,
    /// Minutes
    pub total_time: Option<i64>,
    pub calorie_density: Option<f64>,
    pub weight_in_grams: Option<f64>,
    pub like: Option<bool>,
    pub discarded: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Meal {
    pub fn new(name: EntityName, author_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into_string(),
            author_id: author_id.into(),
            menu_id: None,
            total_time: None,
            calorie_density: None,
            weight_in_grams: None,
            like: None,
            discarded: false,
            audit: Audit::new(),
        }
    }

    pub fn rename(&mut self, name: EntityName) {
        self.name = name.into_string();
    }
}

impl Entity for Meal {
    const TABLE: &'static str = "meals";
    const RESOURCE: &'static str = "meal";
    const TAGS: Option<TagTable> = Some(TagTable::new("meal_tags", "meal_id"));

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
            ("name", self.name.clone().into()),
            ("author_id", self.author_id.clone().into()),
            ("menu_id", self.menu_id.into()),
            ("total_time", self.total_time.into()),
            ("calorie_density", self.calorie_density.into()),
            ("weight_in_grams", self.weight_in_grams.into()),
            ("\"like\"", self.like.into()),
        ]
    }
}

/// A meal with its active recipes
#[derive(Debug, Clone, Serialize)]
pub struct MealWithRecipes {
    #[serde(flatten)]
    pub meal: Meal,
    pub recipes: Vec<Recipe>,
}

/// Meal repository with child loading
pub struct MealRepo<'a> {
    meals: Repository<'a, Meal>,
    recipes: Repository<'a, Recipe>,
}

impl<'a> MealRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self::with_config(pool, QueryConfig::default())
    }

    pub fn with_config(pool: &'a PgPool, config: QueryConfig) -> Self {
        Self {
            meals: Repository::with_config(pool, config),
            recipes: Repository::with_config(pool, config),
        }
    }

    pub fn meals(&self) -> &Repository<'a, Meal> {
        &self.meals
    }

    /// Meal plus recipes in two queries.
    pub async fn get_with_recipes(&self, id: Uuid) -> Result<MealWithRecipes> {
        let meal = self.meals.get(id).await?;
        let recipes = self.recipes_for(&[id]).await?.remove(&id).unwrap_or_default();
        Ok(MealWithRecipes { meal, recipes })
    }

    /// Active recipes of many meals in one query, keyed by meal id.
    pub async fn recipes_for(&self, meal_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Recipe>>> {
        let mut by_meal: HashMap<Uuid, Vec<Recipe>> = HashMap::new();
        if meal_ids.is_empty() {
            return Ok(by_meal);
        }

        let filter = Filter::new()
            .with("meal_id", meal_ids.to_vec())
            .with(SORT, "created_at");
        let recipes = self.recipes.query_all(&filter).await?;
        debug!(meals = meal_ids.len(), recipes = recipes.len(), "loaded recipes");

        for recipe in recipes {
            by_meal.entry(recipe.meal_id).or_default().push(recipe);
        }
        Ok(by_meal)
    }
}
