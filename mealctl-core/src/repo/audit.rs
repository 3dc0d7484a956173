//! Audit mixin: timestamps plus an optimistic-lock version
//!
//! `persist` is an upsert. An update only lands when the stored version
//! still equals the version the caller read; otherwise nothing is
//! returned and the repository reports a conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};

use super::Entity;
use crate::error::FilterError;

/// Audit columns shared by every table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 0 until first stored.
    pub version: i32,
}

impl Audit {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self::new()
    }
}

/// `INSERT ... ON CONFLICT (id) DO UPDATE ... WHERE t.version = <expected> RETURNING *`
pub(crate) fn upsert_query<E: Entity>(entity: &E) -> Result<QueryBuilder<'static, Postgres>, FilterError> {
    let columns = entity.columns();

    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(E::TABLE).push(" AS t (id");
    for (column, _) in &columns {
        qb.push(", ").push(column);
    }
    qb.push(", version) VALUES (").push_bind(entity.id());
    for (column, value) in columns.iter() {
        qb.push(", ");
        value.clone().push_bind(column, &mut qb)?;
    }
    qb.push(", 1) ON CONFLICT (id) DO UPDATE SET ");
    for (column, _) in &columns {
        qb.push(column).push(" = EXCLUDED.").push(column).push(", ");
    }
    qb.push("version = t.version + 1, updated_at = NOW() WHERE t.version = ")
        .push_bind(entity.version())
        .push(" RETURNING *");
    Ok(qb)
}
