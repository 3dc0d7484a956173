use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{ColumnSpec, ColumnType, FilterColumnMapper, FilterSchema, FilterValue, Join};
use crate::repo::{Audit, Entity, TagTable};

/// Link table placing meals on a menu
pub const MENU_MEALS: Join = Join::many("menu_meals", "menu_meals", "menu_meals.menu_id = menus.id");

const COLUMNS: &[(&str, ColumnSpec)] = &[
    ("id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("client_id", ColumnSpec::new("client_id", ColumnType::Uuid)),
    ("author_id", ColumnSpec::new("author_id", ColumnType::Text)),
    ("description", ColumnSpec::new("description", ColumnType::Text)),
    ("created_at", ColumnSpec::new("created_at", ColumnType::Timestamp)),
    ("updated_at", ColumnSpec::new("updated_at", ColumnType::Timestamp)),
];

const MENU_MEAL_COLUMNS: &[(&str, ColumnSpec)] = &[
    ("meal_id", ColumnSpec::new("meal_id", ColumnType::Uuid)),
    ("weekday", ColumnSpec::new("weekday", ColumnType::Text)),
    ("meal_type", ColumnSpec::new("meal_type", ColumnType::Text)),
];

const MAPPERS: &[FilterColumnMapper] = &[
    FilterColumnMapper::root("menus", COLUMNS),
    FilterColumnMapper::joined(MENU_MEAL_COLUMNS, &[MENU_MEALS]),
];

static SCHEMA: FilterSchema = FilterSchema::new(MAPPERS);

/// A weekly menu, optionally assigned to a client
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Menu {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub author_id: String,
    pub description: Option<String>,
    pub discarded: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Menu {
    pub fn new(author_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: None,
            author_id: author_id.into(),
            description: None,
            discarded: false,
            audit: Audit::new(),
        }
    }
}

impl Entity for Menu {
    const TABLE: &'static str = "menus";
    const RESOURCE: &'static str = "menu";
    const TAGS: Option<TagTable> = Some(TagTable::new("menu_tags", "menu_id"));

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
            ("client_id", self.client_id.into()),
            ("author_id", self.author_id.clone().into()),
            ("description", self.description.clone().into()),
        ]
    }
}
