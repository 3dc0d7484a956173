use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{ColumnSpec, ColumnType, FilterColumnMapper, FilterSchema, FilterValue, Join};
use crate::models::EntityName;
use crate::repo::{Audit, Entity};

/// Each product has at most one brand.
pub const BRAND: Join = Join::one("brands", "brand", "brand.id = products.brand_id");

const COLUMNS: &[(&str, ColumnSpec)] = &[
    ("id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("name", ColumnSpec::new("name", ColumnType::Text)),
    ("brand_id", ColumnSpec::new("brand_id", ColumnType::Uuid)),
    ("barcode", ColumnSpec::new("barcode", ColumnType::Text)),
    ("is_food", ColumnSpec::new("is_food", ColumnType::Bool)),
    ("calories", ColumnSpec::new("calories", ColumnType::Float)),
    ("created_at", ColumnSpec::new("created_at", ColumnType::Timestamp)),
    ("updated_at", ColumnSpec::new("updated_at", ColumnType::Timestamp)),
];

const BRAND_COLUMNS: &[(&str, ColumnSpec)] = &[("brand_name", ColumnSpec::new("name", ColumnType::Text))];

const MAPPERS: &[FilterColumnMapper] = &[
    FilterColumnMapper::root("products", COLUMNS),
    FilterColumnMapper::joined(BRAND_COLUMNS, &[BRAND]),
];

static SCHEMA: FilterSchema = FilterSchema::new(MAPPERS);

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand_id: Option<Uuid>,
    pub barcode: Option<String>,
    pub is_food: Option<bool>,
    /// kcal per 100 g
    pub calories: Option<f64>,
    pub discarded: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Product {
    pub fn new(name: EntityName) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into_string(),
            brand_id: None,
            barcode: None,
            is_food: None,
            calories: None,
            discarded: false,
            audit: Audit::new(),
        }
    }
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    const RESOURCE: &'static str = "product";

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
            ("brand_id", self.brand_id.into()),
            ("barcode", self.barcode.clone().into()),
            ("is_food", self.is_food.into()),
            ("calories", self.calories.into()),
        ]
    }
}
