//! Postfix operators on filter keys
//!
//! `total_time_lte = 30` reads as `total_time <= 30`. Keys without a known
//! postfix compare for equality.

use std::fmt;

use sqlx::{Postgres, QueryBuilder};

use super::FilterValue;
use crate::error::FilterError;

/// Comparison selected by a filter key's postfix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    NotIn,
    IsNot,
}

/// Checked in order; `_not_in` and `_is_not` must precede shorter postfixes.
const POSTFIXES: &[(&str, FilterOperator)] = &[
    ("_not_in", FilterOperator::NotIn),
    ("_is_not", FilterOperator::IsNot),
    ("_gte", FilterOperator::Gte),
    ("_lte", FilterOperator::Lte),
    ("_gt", FilterOperator::Gt),
    ("_lt", FilterOperator::Lt),
    ("_ne", FilterOperator::Ne),
];

impl FilterOperator {
    /// Split a filter key into its base key and operator.
    ///
    /// # Example
    /// ```
    /// use mealctl_core::filter::FilterOperator;
    ///
    /// assert_eq!(FilterOperator::split_key("total_time_gte"), ("total_time", FilterOperator::Gte));
    /// assert_eq!(FilterOperator::split_key("name"), ("name", FilterOperator::Eq));
    /// ```
    pub fn split_key(key: &str) -> (&str, FilterOperator) {
        for (postfix, op) in POSTFIXES {
            if let Some(base) = key.strip_suffix(postfix) {
                if !base.is_empty() {
                    return (base, *op);
                }
            }
        }
        (key, FilterOperator::Eq)
    }

    pub fn postfix(&self) -> &'static str {
        match self {
            Self::Eq => "",
            Self::Ne => "_ne",
            Self::Gt => "_gt",
            Self::Gte => "_gte",
            Self::Lt => "_lt",
            Self::Lte => "_lte",
            Self::NotIn => "_not_in",
            Self::IsNot => "_is_not",
        }
    }

    /// Render `column <op> operand` into the builder.
    ///
    /// `column` is a qualified identifier from a static mapper; the operand
    /// is always bound as a parameter.
    pub fn render(
        &self,
        key: &str,
        column: &str,
        value: FilterValue,
        qb: &mut QueryBuilder<'static, Postgres>,
    ) -> Result<(), FilterError> {
        match (self, value) {
            (Self::Eq, FilterValue::Null) => {
                qb.push(column).push(" IS NULL");
            }
            (Self::Eq, FilterValue::List(items)) => push_in_list(key, column, items, false, qb)?,
            (Self::Eq, v) => push_comparison(key, column, "=", v, qb)?,

            (Self::Ne, FilterValue::Null) | (Self::IsNot, FilterValue::Null) => {
                qb.push(column).push(" IS NOT NULL");
            }
            (Self::Ne, FilterValue::List(items)) => push_in_list(key, column, items, true, qb)?,
            (Self::Ne, v) => push_comparison(key, column, "<>", v, qb)?,

            (Self::IsNot, v @ FilterValue::List(_)) => {
                return Err(FilterError::unsupported(key, *self, v.kind()));
            }
            (Self::IsNot, v) => push_comparison(key, column, "IS DISTINCT FROM", v, qb)?,

            (Self::NotIn, v @ FilterValue::Null) => {
                return Err(FilterError::unsupported(key, *self, v.kind()));
            }
            (Self::NotIn, FilterValue::List(items)) => push_in_list(key, column, items, true, qb)?,
            (Self::NotIn, v) => push_in_list(key, column, vec![v], true, qb)?,

            (Self::Gt | Self::Gte | Self::Lt | Self::Lte, v @ (FilterValue::Null | FilterValue::List(_))) => {
                return Err(FilterError::unsupported(key, *self, v.kind()));
            }
            (Self::Gt, v) => push_comparison(key, column, ">", v, qb)?,
            (Self::Gte, v) => push_comparison(key, column, ">=", v, qb)?,
            (Self::Lt, v) => push_comparison(key, column, "<", v, qb)?,
            (Self::Lte, v) => push_comparison(key, column, "<=", v, qb)?,
        }
        Ok(())
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::NotIn => "NOT IN",
            Self::IsNot => "IS NOT",
        };
        f.write_str(symbol)
    }
}

fn push_comparison(
    key: &str,
    column: &str,
    op: &str,
    value: FilterValue,
    qb: &mut QueryBuilder<'static, Postgres>,
) -> Result<(), FilterError> {
    qb.push(column).push(" ").push(op).push(" ");
    value.push_bind(key, qb)
}

/// Lists bind as one array: `col = ANY($n)` or `col <> ALL($n)`. An empty
/// list matches nothing, an empty exclusion matches everything.
fn push_in_list(
    key: &str,
    column: &str,
    items: Vec<FilterValue>,
    negate: bool,
    qb: &mut QueryBuilder<'static, Postgres>,
) -> Result<(), FilterError> {
    let (nulls, values): (Vec<_>, Vec<_>) = items.into_iter().partition(FilterValue::is_null);

    if values.is_empty() && nulls.is_empty() {
        qb.push(if negate { "TRUE" } else { "FALSE" });
        return Ok(());
    }

    if values.is_empty() {
        qb.push(column).push(if negate { " IS NOT NULL" } else { " IS NULL" });
        return Ok(());
    }

    let wrap = !nulls.is_empty();
    if wrap {
        qb.push("(");
    }

    qb.push(column).push(if negate { " <> ALL(" } else { " = ANY(" });
    FilterValue::List(values).push_bind(key, qb)?;
    qb.push(")");

    if wrap {
        qb.push(if negate { " AND " } else { " OR " })
            .push(column)
            .push(if negate { " IS NOT NULL)" } else { " IS NULL)" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(op: FilterOperator, value: FilterValue) -> Result<String, FilterError> {
        let mut qb = QueryBuilder::new("");
        op.render("key", "meals.total_time", value, &mut qb)?;
        Ok(qb.sql().to_owned())
    }

    #[test]
    fn split_known_postfixes() {
        assert_eq!(FilterOperator::split_key("calories_gte"), ("calories", FilterOperator::Gte));
        assert_eq!(FilterOperator::split_key("calories_lte"), ("calories", FilterOperator::Lte));
        assert_eq!(FilterOperator::split_key("calories_gt"), ("calories", FilterOperator::Gt));
        assert_eq!(FilterOperator::split_key("calories_lt"), ("calories", FilterOperator::Lt));
        assert_eq!(FilterOperator::split_key("author_id_ne"), ("author_id", FilterOperator::Ne));
        assert_eq!(FilterOperator::split_key("id_not_in"), ("id", FilterOperator::NotIn));
        assert_eq!(FilterOperator::split_key("menu_id_is_not"), ("menu_id", FilterOperator::IsNot));
    }

    #[test]
    fn split_prefers_longest_postfix() {
        // "_not_in" must not be read as base "x_not" + "_in"
        assert_eq!(FilterOperator::split_key("x_not_in"), ("x", FilterOperator::NotIn));
        assert_eq!(FilterOperator::split_key("x_gte"), ("x", FilterOperator::Gte));
    }

    #[test]
    fn bare_postfix_is_not_split() {
        assert_eq!(FilterOperator::split_key("_gte"), ("_gte", FilterOperator::Eq));
        assert_eq!(FilterOperator::split_key("name"), ("name", FilterOperator::Eq));
    }

    #[test]
    fn renders_scalars_as_binds() {
        assert_eq!(render(FilterOperator::Eq, 5i64.into()).unwrap(), "meals.total_time = $1");
        assert_eq!(render(FilterOperator::Gte, 5i64.into()).unwrap(), "meals.total_time >= $1");
        assert_eq!(render(FilterOperator::Lt, 5i64.into()).unwrap(), "meals.total_time < $1");
        assert_eq!(render(FilterOperator::Ne, 5i64.into()).unwrap(), "meals.total_time <> $1");
        assert_eq!(
            render(FilterOperator::IsNot, 5i64.into()).unwrap(),
            "meals.total_time IS DISTINCT FROM $1"
        );
    }

    #[test]
    fn renders_nulls() {
        assert_eq!(render(FilterOperator::Eq, FilterValue::Null).unwrap(), "meals.total_time IS NULL");
        assert_eq!(render(FilterOperator::Ne, FilterValue::Null).unwrap(), "meals.total_time IS NOT NULL");
        assert_eq!(
            render(FilterOperator::IsNot, FilterValue::Null).unwrap(),
            "meals.total_time IS NOT NULL"
        );
    }

    #[test]
    fn renders_lists() {
        assert_eq!(
            render(FilterOperator::Eq, vec![1i64, 2, 3].into()).unwrap(),
            "meals.total_time = ANY($1)"
        );
        assert_eq!(
            render(FilterOperator::NotIn, vec![1i64, 2].into()).unwrap(),
            "meals.total_time <> ALL($1)"
        );
        assert_eq!(
            render(FilterOperator::NotIn, 7i64.into()).unwrap(),
            "meals.total_time <> ALL($1)"
        );
        assert_eq!(
            render(FilterOperator::Ne, vec![1i64].into()).unwrap(),
            "meals.total_time <> ALL($1)"
        );
    }

    #[test]
    fn empty_lists() {
        assert_eq!(render(FilterOperator::Eq, FilterValue::List(vec![])).unwrap(), "FALSE");
        assert_eq!(render(FilterOperator::NotIn, FilterValue::List(vec![])).unwrap(), "TRUE");
    }

    #[test]
    fn lists_with_null() {
        let v = FilterValue::List(vec![FilterValue::Int(1), FilterValue::Null]);
        assert_eq!(
            render(FilterOperator::Eq, v.clone()).unwrap(),
            "(meals.total_time = ANY($1) OR meals.total_time IS NULL)"
        );
        assert_eq!(
            render(FilterOperator::NotIn, v).unwrap(),
            "(meals.total_time <> ALL($1) AND meals.total_time IS NOT NULL)"
        );
    }

    #[test]
    fn rejects_invalid_operands() {
        assert!(matches!(
            render(FilterOperator::Gte, FilterValue::Null),
            Err(FilterError::UnsupportedOperator { operand: "null", .. })
        ));
        assert!(matches!(
            render(FilterOperator::Lte, vec![1i64].into()),
            Err(FilterError::UnsupportedOperator { operand: "list", .. })
        ));
        assert!(matches!(
            render(FilterOperator::IsNot, vec![1i64].into()),
            Err(FilterError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            render(FilterOperator::NotIn, FilterValue::Null),
            Err(FilterError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn postfix_round_trip() {
        for (postfix, op) in POSTFIXES {
            assert_eq!(op.postfix(), *postfix);
            let key = format!("calories{}", op.postfix());
            assert_eq!(FilterOperator::split_key(&key), ("calories", *op));
        }
    }
}
