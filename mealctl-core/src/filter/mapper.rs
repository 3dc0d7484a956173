//! Filter key → column mapping with join paths
//!
//! Each entity declares a `FilterSchema`: its root mapper first, then one
//! mapper per related table. A related mapper carries the joins that lead
//! from the root to its table. Joins are shared constants, so two mappers
//! that walk through the same table use the same alias.

use super::{ColumnType, FilterOperator};
use crate::error::FilterError;

/// Column reached by a filter key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: &'static str,
    pub ty: ColumnType,
}

impl ColumnSpec {
    pub const fn new(column: &'static str, ty: ColumnType) -> Self {
        Self { column, ty }
    }
}

/// One hop along a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    pub table: &'static str,
    /// Alias used in SQL; also the deduplication key.
    pub alias: &'static str,
    /// Static join condition, written against aliases.
    pub on: &'static str,
    /// To-many relationships can multiply root rows.
    pub many: bool,
}

impl Join {
    pub const fn one(table: &'static str, alias: &'static str, on: &'static str) -> Self {
        Self {
            table,
            alias,
            on,
            many: false,
        }
    }

    pub const fn many(table: &'static str, alias: &'static str, on: &'static str) -> Self {
        Self {
            table,
            alias,
            on,
            many: true,
        }
    }
}

/// Maps filter keys onto the columns of one table
#[derive(Debug, Clone, Copy)]
pub struct FilterColumnMapper {
    pub table: &'static str,
    pub alias: &'static str,
    /// filter key → column
    pub columns: &'static [(&'static str, ColumnSpec)],
    /// Joins from the root table to `table`, parents first. Empty for the root.
    pub join_path: &'static [Join],
}

impl FilterColumnMapper {
    pub const fn root(table: &'static str, columns: &'static [(&'static str, ColumnSpec)]) -> Self {
        Self {
            table,
            alias: table,
            columns,
            join_path: &[],
        }
    }

    /// Mapper for a related table. The alias is the last join's alias.
    pub const fn joined(
        columns: &'static [(&'static str, ColumnSpec)],
        join_path: &'static [Join],
    ) -> Self {
        let last = join_path[join_path.len() - 1];
        Self {
            table: last.table,
            alias: last.alias,
            columns,
            join_path,
        }
    }

    pub fn column(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|(k, _)| *k == key).map(|(_, spec)| spec)
    }

    pub fn is_root(&self) -> bool {
        self.join_path.is_empty()
    }

    /// `alias.column` for use in SQL.
    pub fn qualify(&self, spec: &ColumnSpec) -> String {
        format!("{}.{}", self.alias, spec.column)
    }
}

/// A filter key resolved against a schema
#[derive(Debug, Clone, Copy)]
pub struct ResolvedKey<'s> {
    pub mapper: &'s FilterColumnMapper,
    pub spec: &'s ColumnSpec,
    pub operator: FilterOperator,
}

impl ResolvedKey<'_> {
    pub fn qualified_column(&self) -> String {
        self.mapper.qualify(self.spec)
    }
}

/// All filterable keys of one entity
#[derive(Debug, Clone, Copy)]
pub struct FilterSchema {
    /// Root mapper first.
    pub mappers: &'static [FilterColumnMapper],
}

impl FilterSchema {
    pub const fn new(mappers: &'static [FilterColumnMapper]) -> Self {
        Self { mappers }
    }

    pub fn root(&self) -> &FilterColumnMapper {
        &self.mappers[0]
    }

    fn lookup(&self, key: &str) -> Option<(&FilterColumnMapper, &ColumnSpec)> {
        self.mappers
            .iter()
            .find_map(|m| m.column(key).map(|spec| (m, spec)))
    }

    /// Resolve a filter key. A key that names a column exactly is taken
    /// as-is before any postfix is stripped.
    pub fn resolve(&self, key: &str) -> Result<ResolvedKey<'_>, FilterError> {
        if let Some((mapper, spec)) = self.lookup(key) {
            return Ok(ResolvedKey {
                mapper,
                spec,
                operator: FilterOperator::Eq,
            });
        }

        let (base, operator) = FilterOperator::split_key(key);
        if operator != FilterOperator::Eq {
            if let Some((mapper, spec)) = self.lookup(base) {
                return Ok(ResolvedKey {
                    mapper,
                    spec,
                    operator,
                });
            }
        }

        Err(FilterError::unknown_key(key))
    }

    /// Resolve a sort key. Only root-table columns sort.
    pub fn sort_column(&self, key: &str) -> Result<String, FilterError> {
        let root = self.root();
        if let Some(spec) = root.column(key) {
            return Ok(root.qualify(spec));
        }
        if self.lookup(key).is_some() {
            return Err(FilterError::invalid_sort(key, "only columns of the root table can be sorted"));
        }
        Err(FilterError::invalid_sort(key, "unknown key"))
    }

    /// Every filter key with its table, for listings.
    pub fn keys(&self) -> impl Iterator<Item = (&'static str, &'static str, ColumnType)> + '_ {
        self.mappers
            .iter()
            .flat_map(|m| m.columns.iter().map(move |(k, spec)| (*k, m.table, spec.ty)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPES: Join = Join::many("recipes", "recipes", "recipes.meal_id = meals.id");
    const INGREDIENTS: Join =
        Join::many("ingredients", "ingredients", "ingredients.recipe_id = recipes.id");

    const MEAL_COLUMNS: &[(&str, ColumnSpec)] = &[
        ("id", ColumnSpec::new("id", ColumnType::Uuid)),
        ("name", ColumnSpec::new("name", ColumnType::Text)),
        ("total_time", ColumnSpec::new("total_time", ColumnType::Int)),
        ("budget_lt", ColumnSpec::new("budget_lt", ColumnType::Int)),
    ];
    const RECIPE_COLUMNS: &[(&str, ColumnSpec)] =
        &[("recipe_name", ColumnSpec::new("name", ColumnType::Text))];
    const INGREDIENT_COLUMNS: &[(&str, ColumnSpec)] =
        &[("products", ColumnSpec::new("product_id", ColumnType::Uuid))];

    const MAPPERS: &[FilterColumnMapper] = &[
        FilterColumnMapper::root("meals", MEAL_COLUMNS),
        FilterColumnMapper::joined(RECIPE_COLUMNS, &[RECIPES]),
        FilterColumnMapper::joined(INGREDIENT_COLUMNS, &[RECIPES, INGREDIENTS]),
    ];

    static SCHEMA: FilterSchema = FilterSchema::new(MAPPERS);

    #[test]
    fn resolves_root_and_joined_keys() {
        let r = SCHEMA.resolve("name").unwrap();
        assert!(r.mapper.is_root());
        assert_eq!(r.qualified_column(), "meals.name");

        let r = SCHEMA.resolve("recipe_name").unwrap();
        assert_eq!(r.qualified_column(), "recipes.name");
        assert_eq!(r.mapper.join_path, &[RECIPES]);

        let r = SCHEMA.resolve("products_not_in").unwrap();
        assert_eq!(r.operator, FilterOperator::NotIn);
        assert_eq!(r.qualified_column(), "ingredients.product_id");
        assert_eq!(r.mapper.join_path.len(), 2);
    }

    #[test]
    fn exact_column_beats_postfix() {
        let r = SCHEMA.resolve("budget_lt").unwrap();
        assert_eq!(r.operator, FilterOperator::Eq);
        assert_eq!(r.spec.column, "budget_lt");

        let r = SCHEMA.resolve("budget_lt_gte").unwrap();
        assert_eq!(r.operator, FilterOperator::Gte);
        assert_eq!(r.spec.column, "budget_lt");
    }

    #[test]
    fn postfix_on_column() {
        let r = SCHEMA.resolve("total_time_lte").unwrap();
        assert_eq!(r.operator, FilterOperator::Lte);
        assert_eq!(r.spec.ty, ColumnType::Int);
    }

    #[test]
    fn unknown_keys() {
        assert_eq!(
            SCHEMA.resolve("colour").unwrap_err(),
            FilterError::unknown_key("colour")
        );
        assert_eq!(
            SCHEMA.resolve("colour_gte").unwrap_err(),
            FilterError::unknown_key("colour_gte")
        );
    }

    #[test]
    fn sort_only_on_root() {
        assert_eq!(SCHEMA.sort_column("name").unwrap(), "meals.name");
        assert!(matches!(
            SCHEMA.sort_column("recipe_name"),
            Err(FilterError::InvalidSort { reason: "only columns of the root table can be sorted", .. })
        ));
        assert!(matches!(
            SCHEMA.sort_column("nope"),
            Err(FilterError::InvalidSort { reason: "unknown key", .. })
        ));
    }

    #[test]
    fn lists_keys() {
        let keys: Vec<_> = SCHEMA.keys().map(|(k, _, _)| k).collect();
        assert_eq!(keys, ["id", "name", "total_time", "budget_lt", "recipe_name", "products"]);
    }
}
