//! Tag filtering mixin
//!
//! Tags live in a side table per entity (`meal_tags`, ...) with columns
//! `(<owner>, key, value, author_id)`. Filters never join the tag table;
//! each constraint is a correlated `EXISTS` subquery on the owner column.

use sqlx::{Postgres, QueryBuilder};

use crate::models::Tag;
use crate::query::Predicate;

/// Side table holding an entity's tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagTable {
    pub table: &'static str,
    /// References the owning row's id.
    pub owner_column: &'static str,
}

impl TagTable {
    pub const fn new(table: &'static str, owner_column: &'static str) -> Self {
        Self { table, owner_column }
    }
}

/// Tags sharing a key and author
#[derive(Debug, Clone, PartialEq)]
struct TagGroup {
    key: String,
    author_id: Option<String>,
    values: Vec<String>,
}

/// Group tags by `(key, author)`, keeping first-seen order.
fn group(tags: Vec<Tag>) -> Vec<TagGroup> {
    let mut groups: Vec<TagGroup> = Vec::new();
    for tag in tags {
        match groups
            .iter_mut()
            .find(|g| (g.key.as_str(), g.author_id.as_deref()) == tag.group())
        {
            Some(g) if g.values.contains(&tag.value) => {}
            Some(g) => g.values.push(tag.value),
            None => groups.push(TagGroup {
                key: tag.key,
                author_id: tag.author_id,
                values: vec![tag.value],
            }),
        }
    }
    groups
}

fn push_subquery_head(table: &TagTable, root: &str, qb: &mut QueryBuilder<'static, Postgres>) {
    qb.push("(SELECT 1 FROM ")
        .push(table.table)
        .push(" tg WHERE tg.")
        .push(table.owner_column)
        .push(" = ")
        .push(root)
        .push(".id AND ");
}

fn push_author(author_id: &Option<String>, qb: &mut QueryBuilder<'static, Postgres>) {
    if let Some(author) = author_id {
        qb.push(" AND tg.author_id = ").push_bind(author.clone());
    }
}

/// `tags`: every group must match. Within a group any value matches.
#[derive(Debug, Clone)]
pub struct HasTags {
    table: TagTable,
    groups: Vec<TagGroup>,
}

impl HasTags {
    /// `None` for an empty tag list.
    pub fn new(table: TagTable, tags: Vec<Tag>) -> Option<Self> {
        if tags.is_empty() {
            return None;
        }
        Some(Self {
            table,
            groups: group(tags),
        })
    }
}

impl Predicate for HasTags {
    fn render(&self, root: &str, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, g) in self.groups.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            qb.push("EXISTS ");
            push_subquery_head(&self.table, root, qb);
            qb.push("tg.key = ").push_bind(g.key.clone());

            if let [value] = g.values.as_slice() {
                qb.push(" AND tg.value = ").push_bind(value.clone());
            } else {
                qb.push(" AND tg.value IN (");
                let mut values = qb.separated(", ");
                for value in &g.values {
                    values.push_bind(value.clone());
                }
                values.push_unseparated(")");
            }

            push_author(&g.author_id, qb);
            qb.push(")");
        }
    }
}

/// `tags_not_exists`: none of the tags may be present.
#[derive(Debug, Clone)]
pub struct LacksTags {
    table: TagTable,
    tags: Vec<Tag>,
}

impl LacksTags {
    /// `None` for an empty tag list.
    pub fn new(table: TagTable, tags: Vec<Tag>) -> Option<Self> {
        if tags.is_empty() {
            return None;
        }
        Some(Self { table, tags })
    }
}

impl Predicate for LacksTags {
    fn render(&self, root: &str, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push("NOT EXISTS ");
        push_subquery_head(&self.table, root, qb);
        qb.push("(");
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("(tg.key = ")
                .push_bind(tag.key.clone())
                .push(" AND tg.value = ")
                .push_bind(tag.value.clone());
            push_author(&tag.author_id, qb);
            qb.push(")");
        }
        qb.push("))");
    }
}
