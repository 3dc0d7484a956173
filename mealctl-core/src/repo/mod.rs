//! Generic repository over a filter schema
//!
//! An [`Entity`] declares its table, filter schema and mixins; the
//! [`Repository`] turns filter dictionaries into SQL through
//! [`SelectBuilder`] and maps rows back with `sqlx::FromRow`.

pub mod audit;
pub mod soft_delete;
pub mod tags;

use std::marker::PhantomData;

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use audit::Audit;
pub use soft_delete::Discarded;
pub use tags::{HasTags, LacksTags, TagTable};

use crate::error::{FilterError, RepoError, Result};
use crate::filter::{Filter, FilterSchema, FilterValue, DISCARDED, LIMIT, SKIP, SORT, TAGS, TAGS_NOT_EXISTS};
use crate::models::{Paginated, Pagination, Tag};
use crate::query::{QueryConfig, SelectBuilder, SortKey};

/// A record type stored in one table
pub trait Entity: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    /// Name used in errors and logs.
    const RESOURCE: &'static str;
    const SOFT_DELETE: bool = true;
    const TAGS: Option<TagTable> = None;

    fn schema() -> &'static FilterSchema;

    fn id(&self) -> Uuid;

    /// Version the caller read, 0 for a record never stored.
    fn version(&self) -> i32;

    /// Column values to write, without `id` and audit columns.
    fn columns(&self) -> Vec<(&'static str, FilterValue)>;
}

/// Repository for one entity type
pub struct Repository<'a, E> {
    pool: &'a PgPool,
    config: QueryConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Repository<'a, E> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self::with_config(pool, QueryConfig::default())
    }

    pub fn with_config(pool: &'a PgPool, config: QueryConfig) -> Self {
        Self {
            pool,
            config,
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &'a PgPool {
        self.pool
    }

    /// SQL that [`query`](Self::query) would run. No I/O.
    pub fn explain(&self, filter: &Filter) -> Result<String> {
        explain::<E>(filter, &self.config)
    }

    pub async fn query(&self, filter: &Filter) -> Result<Vec<E>> {
        let builder = select::<E>(filter, &self.config).inspect_err(log_filter_error::<E>)?;
        self.fetch(&builder).await
    }

    /// Like `query` but ignores `limit` and the configured default.
    pub(crate) async fn query_all(&self, filter: &Filter) -> Result<Vec<E>> {
        let builder = select_unbounded::<E>(filter).inspect_err(log_filter_error::<E>)?;
        self.fetch(&builder).await
    }

    async fn fetch(&self, builder: &SelectBuilder) -> Result<Vec<E>> {
        let mut qb = builder.build().map_err(RepoError::from).inspect_err(log_filter_error::<E>)?;
        debug!(resource = E::RESOURCE, sql = qb.sql(), "query");

        let rows = qb
            .build_query_as::<E>()
            .fetch_all(self.pool)
            .await
            .inspect_err(|e| error!(resource = E::RESOURCE, "query failed: {}", e))?;

        debug!(resource = E::RESOURCE, rows = rows.len(), "query done");
        Ok(rows)
    }

    pub async fn count(&self, filter: &Filter) -> Result<i64> {
        let builder = select_unbounded::<E>(filter).inspect_err(log_filter_error::<E>)?;
        let mut qb = builder
            .build_count()
            .map_err(RepoError::from)
            .inspect_err(log_filter_error::<E>)?;
        debug!(resource = E::RESOURCE, sql = qb.sql(), "count");

        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await
            .inspect_err(|e| error!(resource = E::RESOURCE, "count failed: {}", e))?;
        Ok(total)
    }

    /// One page plus the total matching the filter. The page replaces any
    /// `limit`/`skip` in the filter.
    pub async fn query_page(&self, filter: &Filter, page: Pagination) -> Result<Paginated<E>> {
        let mut paged = filter.clone();
        paged.insert(LIMIT, i64::from(page.limit()));
        paged.insert(SKIP, i64::try_from(page.skip()).unwrap_or(i64::MAX));

        let items = self.query(&paged).await?;
        let total = self.count(filter).await?;
        Ok(page.wrap(items, total))
    }

    /// Active entity by id.
    pub async fn get(&self, id: Uuid) -> Result<E> {
        let filter = Filter::new().with("id", id).with(LIMIT, 1i64);
        self.query(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::not_found(E::RESOURCE, id))
    }

    /// Insert or update under the version check. Returns the stored row.
    pub async fn persist(&self, entity: &E) -> Result<E> {
        let mut qb = audit::upsert_query(entity)
            .map_err(RepoError::from)
            .inspect_err(log_filter_error::<E>)?;
        debug!(resource = E::RESOURCE, sql = qb.sql(), "persist");

        let stored = qb
            .build_query_as::<E>()
            .fetch_optional(self.pool)
            .await
            .inspect_err(|e| error!(resource = E::RESOURCE, "persist failed: {}", e))?;

        match stored {
            Some(row) => {
                info!(resource = E::RESOURCE, id = %row.id(), version = row.version(), "persisted");
                Ok(row)
            }
            None => {
                warn!(
                    resource = E::RESOURCE,
                    id = %entity.id(),
                    expected_version = entity.version(),
                    "version conflict"
                );
                Err(RepoError::Conflict {
                    resource: E::RESOURCE,
                    id: entity.id().to_string(),
                    expected_version: entity.version(),
                })
            }
        }
    }

    /// Flag an active row as discarded.
    pub async fn discard(&self, id: Uuid) -> Result<()> {
        if !E::SOFT_DELETE {
            warn!(resource = E::RESOURCE, %id, "discard on an entity without soft delete");
            return Err(RepoError::unsupported(E::RESOURCE, "discard"));
        }

        let result = soft_delete::discard_query(E::TABLE, id)
            .build()
            .execute(self.pool)
            .await
            .inspect_err(|e| error!(resource = E::RESOURCE, %id, "discard failed: {}", e))?;

        if result.rows_affected() == 0 {
            warn!(resource = E::RESOURCE, %id, "nothing to discard");
            return Err(RepoError::not_found(E::RESOURCE, id));
        }
        info!(resource = E::RESOURCE, %id, "discarded");
        Ok(())
    }

    /// Tags attached to an entity, in key/value order.
    pub async fn tags(&self, id: Uuid) -> Result<Vec<Tag>> {
        let table = E::TAGS
            .ok_or_else(|| RepoError::unsupported(E::RESOURCE, "tags"))
            .inspect_err(|e| warn!(resource = E::RESOURCE, %id, "{}", e))?;

        let sql = format!(
            "SELECT key, value, author_id FROM {} WHERE {} = $1 ORDER BY key, value, author_id",
            table.table, table.owner_column
        );
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(self.pool)
            .await
            .inspect_err(|e| error!(resource = E::RESOURCE, %id, "loading tags failed: {}", e))?;

        Ok(rows
            .into_iter()
            .map(|(key, value, author_id)| Tag {
                key,
                value,
                author_id,
            })
            .collect())
    }

    /// Replace all tags of an entity in one transaction.
    pub async fn set_tags(&self, id: Uuid, tags: &[Tag]) -> Result<()> {
        self.replace_tags(id, tags)
            .await
            .inspect_err(|e| match e {
                RepoError::Database(_) => error!(resource = E::RESOURCE, %id, "replacing tags failed: {}", e),
                _ => warn!(resource = E::RESOURCE, %id, "tags not replaced: {}", e),
            })
    }

    async fn replace_tags(&self, id: Uuid, tags: &[Tag]) -> Result<()> {
        let table = E::TAGS.ok_or_else(|| RepoError::unsupported(E::RESOURCE, "tags"))?;
        let mut tx = self.pool.begin().await?;

        let active = if E::SOFT_DELETE { " AND discarded = FALSE" } else { "" };
        let exists: (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1{})",
            E::TABLE,
            active
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists.0 {
            return Err(RepoError::not_found(E::RESOURCE, id));
        }

        sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", table.table, table.owner_column))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO {} ({}, key, value, author_id) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
            table.table, table.owner_column
        );
        let mut unique = tags.to_vec();
        unique.sort();
        unique.dedup();

        for tag in &unique {
            sqlx::query(&insert)
                .bind(id)
                .bind(&tag.key)
                .bind(&tag.value)
                .bind(tag.author_id.as_deref())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(resource = E::RESOURCE, %id, count = unique.len(), "tags replaced");
        Ok(())
    }
}

/// Everything a filter asks for, limit included.
pub fn select<E: Entity>(filter: &Filter, config: &QueryConfig) -> Result<SelectBuilder> {
    let builder = select_unbounded::<E>(filter)?;
    Ok(builder
        .limit(config.effective_limit(filter.limit()?))
        .offset(filter.skip()?))
}

/// Joins, predicates and sort without paging.
pub(crate) fn select_unbounded<E: Entity>(filter: &Filter) -> Result<SelectBuilder> {
    let mut builder = SelectBuilder::new(E::schema()).filter(filter)?;

    if E::SOFT_DELETE {
        if let Some(p) = soft_delete::predicate(filter)? {
            builder = builder.predicate(p);
        }
    } else if filter.contains(DISCARDED) {
        return Err(FilterError::unknown_key(DISCARDED).into());
    }

    match E::TAGS {
        Some(table) => {
            if let Some(p) = HasTags::new(table, filter.tags(TAGS)?) {
                builder = builder.predicate(p);
            }
            if let Some(p) = LacksTags::new(table, filter.tags(TAGS_NOT_EXISTS)?) {
                builder = builder.predicate(p);
            }
        }
        None => {
            if let Some(key) = [TAGS, TAGS_NOT_EXISTS].into_iter().find(|k| filter.contains(k)) {
                return Err(FilterError::unknown_key(key).into());
            }
        }
    }

    Ok(builder.sort(&SortKey::from_value(filter.get(SORT))?)?)
}

/// SQL for a filter against `E`, binds shown as `$n`. No database needed.
pub fn explain<E: Entity>(filter: &Filter, config: &QueryConfig) -> Result<String> {
    Ok(select::<E>(filter, config)?.to_sql()?)
}

fn log_filter_error<E: Entity>(e: &RepoError) {
    warn!(resource = E::RESOURCE, "rejected filter: {}", e);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Meal, Product};
    use sqlx::postgres::PgPoolOptions;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    // Never connects: every path below fails before any I/O.
    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost/mealctl_unused")
            .unwrap()
    }

    #[tokio::test]
    async fn operator_errors_at_render_time_are_logged() {
        let (logs, _guard) = capture();
        let pool = lazy_pool();
        let repo = Repository::<Meal>::new(&pool);

        let filter = Filter::new().with("total_time_gte", FilterValue::Null);
        let err = repo.query(&filter).await.unwrap_err();
        assert!(matches!(err, RepoError::Filter(FilterError::UnsupportedOperator { .. })));

        let err = repo.count(&filter).await.unwrap_err();
        assert!(matches!(err, RepoError::Filter(_)));

        let text = logs.text();
        assert_eq!(text.matches("rejected filter").count(), 2, "{}", text);
        assert!(text.contains("total_time_gte"));
    }

    #[tokio::test]
    async fn unsupported_tag_access_is_logged() {
        let (logs, _guard) = capture();
        let pool = lazy_pool();
        let repo = Repository::<Product>::new(&pool);

        let err = repo.tags(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, RepoError::Unsupported { operation: "tags", .. }));

        let err = repo.set_tags(Uuid::nil(), &[]).await.unwrap_err();
        assert!(matches!(err, RepoError::Unsupported { .. }));

        let text = logs.text();
        assert!(text.contains("tags is not supported for product"), "{}", text);
        assert!(text.contains("tags not replaced"), "{}", text);
    }

    #[test]
    fn explain_needs_no_pool() {
        let filter = Filter::new().with("meal_id", vec![Uuid::nil(), Uuid::new_v4()]);
        let sql = explain::<crate::entities::Recipe>(&filter, &QueryConfig::default()).unwrap();
        assert!(sql.contains("recipes.meal_id = ANY($1)"), "{}", sql);
    }
}
