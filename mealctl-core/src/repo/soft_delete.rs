//! Soft delete mixin: rows are flagged `discarded` instead of removed

use sqlx::{Postgres, QueryBuilder};

use crate::error::FilterError;
use crate::filter::{ColumnType, Filter, FilterValue, DISCARDED};
use crate::query::Predicate;

/// `root.discarded = <bool>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discarded(pub bool);

impl Predicate for Discarded {
    fn render(&self, root: &str, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(root).push(".discarded = ").push_bind(self.0);
    }
}

/// Predicate for a filter: active rows by default, the requested state
/// when `discarded` is given, nothing when it is `null`.
pub fn predicate(filter: &Filter) -> Result<Option<Discarded>, FilterError> {
    match filter.get(DISCARDED) {
        None => Ok(Some(Discarded(false))),
        Some(FilterValue::Null) => Ok(None),
        Some(v) => match v.clone().coerce(DISCARDED, ColumnType::Bool)? {
            FilterValue::Bool(b) => Ok(Some(Discarded(b))),
            other => Err(FilterError::invalid_value(
                DISCARDED,
                format!("expected bool or null, got {}", other.kind()),
            )),
        },
    }
}

/// `UPDATE ... SET discarded = TRUE` for one active row.
pub(crate) fn discard_query(table: &'static str, id: uuid::Uuid) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(table)
        .push(" SET discarded = TRUE, version = version + 1, updated_at = NOW() WHERE id = ")
        .push_bind(id)
        .push(" AND discarded = FALSE");
    qb
}
