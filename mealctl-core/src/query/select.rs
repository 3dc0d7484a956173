//! SELECT rendering for a filter schema
//!
//! Column keys resolve to `(mapper, column, operator)`; every mapper
//! reached contributes its join path. Joins are collected before anything
//! is rendered so that bind numbering follows SQL text order.

use std::collections::HashSet;
use std::fmt;

use sqlx::{Postgres, QueryBuilder};
use tracing::trace;

use super::sort::{SortDirection, SortKey};
use crate::error::FilterError;
use crate::filter::{Filter, FilterOperator, FilterSchema, FilterValue, Join};

/// Extra WHERE condition contributed by a repository mixin
pub trait Predicate: fmt::Debug + Send + Sync {
    /// Render against the root table alias. Operands must be bound.
    fn render(&self, root: &str, qb: &mut QueryBuilder<'static, Postgres>);
}

#[derive(Debug, Clone)]
struct Condition {
    key: String,
    column: String,
    operator: FilterOperator,
    value: FilterValue,
}

/// Accumulates joins, predicates, ordering and paging for one query
#[derive(Debug)]
pub struct SelectBuilder {
    schema: &'static FilterSchema,
    joins: Vec<Join>,
    joined: HashSet<&'static str>,
    conditions: Vec<Condition>,
    predicates: Vec<Box<dyn Predicate>>,
    order: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub fn new(schema: &'static FilterSchema) -> Self {
        Self {
            schema,
            joins: Vec::new(),
            joined: HashSet::new(),
            conditions: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Add a predicate for every column key in `filter`. Reserved keys are
    /// left to the caller.
    pub fn filter(mut self, filter: &Filter) -> Result<Self, FilterError> {
        for (key, value) in filter.columns() {
            let resolved = self.schema.resolve(key)?;
            let value = value.clone().coerce(key, resolved.spec.ty)?;
            let column = resolved.qualified_column();
            self.require(resolved.mapper.join_path);

            self.conditions.push(Condition {
                key: key.to_owned(),
                column,
                operator: resolved.operator,
                value,
            });
        }
        Ok(self)
    }

    /// Add the joins of `path`, skipping aliases already joined.
    fn require(&mut self, path: &'static [Join]) {
        for join in path {
            if self.joined.insert(join.alias) {
                self.joins.push(*join);
            } else {
                trace!(alias = join.alias, "join already present");
            }
        }
    }

    pub fn predicate(mut self, predicate: impl Predicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn sort(mut self, keys: &[SortKey]) -> Result<Self, FilterError> {
        for key in keys {
            let column = self.schema.sort_column(&key.key)?;
            self.order.push((column, key.direction));
        }
        Ok(self)
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u64>) -> Self {
        self.offset = offset.filter(|n| *n > 0);
        self
    }

    /// Joins in emission order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// A to-many join can repeat root rows.
    pub fn is_distinct(&self) -> bool {
        self.joins.iter().any(|j| j.many)
    }

    /// `SELECT [DISTINCT] root.* ...`
    pub fn build(&self) -> Result<QueryBuilder<'static, Postgres>, FilterError> {
        let root = self.schema.root();
        let mut qb = QueryBuilder::new("SELECT ");
        if self.is_distinct() {
            qb.push("DISTINCT ");
        }
        qb.push(root.alias).push(".*");

        self.push_from_where(&mut qb)?;
        self.push_order(&mut qb);

        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(clamp_i64(limit));
        }
        if let Some(offset) = self.offset {
            qb.push(" OFFSET ").push_bind(clamp_i64(offset));
        }
        Ok(qb)
    }

    /// `SELECT COUNT(DISTINCT root.id) ...` over the same joins and predicates.
    pub fn build_count(&self) -> Result<QueryBuilder<'static, Postgres>, FilterError> {
        let root = self.schema.root();
        let mut qb = QueryBuilder::new("SELECT COUNT(DISTINCT ");
        qb.push(root.alias).push(".id)");
        self.push_from_where(&mut qb)?;
        Ok(qb)
    }

    /// SQL text of [`build`](Self::build), binds as `$n`.
    pub fn to_sql(&self) -> Result<String, FilterError> {
        Ok(self.build()?.sql().to_owned())
    }

    fn push_from_where(&self, qb: &mut QueryBuilder<'static, Postgres>) -> Result<(), FilterError> {
        let root = self.schema.root();
        qb.push(" FROM ").push(root.table);

        for join in &self.joins {
            qb.push(" JOIN ").push(join.table);
            if join.alias != join.table {
                qb.push(" AS ").push(join.alias);
            }
            qb.push(" ON ").push(join.on);
        }

        let mut first = true;
        let mut next = |qb: &mut QueryBuilder<'static, Postgres>| {
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        for cond in &self.conditions {
            next(qb);
            cond.operator
                .render(&cond.key, &cond.column, cond.value.clone(), qb)?;
        }
        for predicate in &self.predicates {
            next(qb);
            predicate.render(root.alias, qb);
        }
        Ok(())
    }

    fn push_order(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if self.order.is_empty() && self.limit.is_none() && self.offset.is_none() {
            return;
        }

        let id = format!("{}.id", self.schema.root().alias);
        let mut terms: Vec<String> = self
            .order
            .iter()
            .map(|(column, direction)| format!("{} {} NULLS LAST", column, direction.as_sql()))
            .collect();
        if !self.order.iter().any(|(column, _)| *column == id) {
            terms.push(format!("{} ASC", id));
        }
        qb.push(" ORDER BY ").push(terms.join(", "));
    }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
