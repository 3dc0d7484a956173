use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{ColumnSpec, ColumnType, FilterColumnMapper, FilterSchema, FilterValue, Join};
use crate::models::EntityName;
use crate::repo::{Audit, Entity, TagTable};

pub const MENUS: Join = Join::many("menus", "menus", "menus.client_id = clients.id");

const COLUMNS: &[(&str, ColumnSpec)] = &[
    ("id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("author_id", ColumnSpec::new("author_id", ColumnType::Text)),
    ("profile_name", ColumnSpec::new("profile_name", ColumnType::Text)),
    ("onboarding_source", ColumnSpec::new("onboarding_source", ColumnType::Text)),
    ("created_at", ColumnSpec::new("created_at", ColumnType::Timestamp)),
    ("updated_at", ColumnSpec::new("updated_at", ColumnType::Timestamp)),
];

const MENU_COLUMNS: &[(&str, ColumnSpec)] = &[
    ("menu_id", ColumnSpec::new("id", ColumnType::Uuid)),
    ("menu_author_id", ColumnSpec::new("author_id", ColumnType::Text)),
    ("menu_description", ColumnSpec::new("description", ColumnType::Text)),
];

const MAPPERS: &[FilterColumnMapper] = &[
    FilterColumnMapper::root("clients", COLUMNS),
    FilterColumnMapper::joined(MENU_COLUMNS, &[MENUS]),
];

static SCHEMA: FilterSchema = FilterSchema::new(MAPPERS);

/// A nutritionist's client
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    /// Nutritionist who owns the client
    pub author_id: String,
    pub profile_name: String,
    pub onboarding_source: Option<String>,
    pub discarded: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Client {
    pub fn new(profile_name: EntityName, author_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: author_id.into(),
            profile_name: profile_name.into_string(),
            onboarding_source: None,
            discarded: false,
            audit: Audit::new(),
        }
    }
}

impl Entity for Client {
    const TABLE: &'static str = "clients";
    const RESOURCE: &'static str = "client";
    const TAGS: Option<TagTable> = Some(TagTable::new("client_tags", "client_id"));

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
            ("author_id", self.author_id.clone().into()),
            ("profile_name", self.profile_name.clone().into()),
            ("onboarding_source", self.onboarding_source.clone().into()),
        ]
    }
}
