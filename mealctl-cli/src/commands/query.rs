//! `query`, `count` and `explain`: filter dictionaries from the command line
//!
//! Filters come from `--json '{...}'` first, then each `-f key=value`, then
//! the convenience flags (`--tag`, `--sort`, `--limit`, ...). Later sources
//! overwrite earlier ones key by key.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use mealctl_core::filter::{Filter, FilterValue, LIMIT, SKIP, SORT, TAGS, TAGS_NOT_EXISTS};
use mealctl_core::models::{Pagination, Tag};
use mealctl_core::repo::{self, Repository};
use mealctl_core::MealctlConfig;
use tracing::info;

use super::{connect, for_entity, EntityKind};

#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Entity to query
    #[arg(value_enum)]
    pub entity: EntityKind,

    /// Filter as KEY=VALUE (repeatable). Commas make a list; null, true and false are literals
    #[arg(short = 'f', long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Filter as a JSON object
    #[arg(long, value_name = "OBJECT")]
    pub json: Option<String>,

    /// Require a tag, key::value[@author] (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Exclude rows carrying this tag (repeatable)
    #[arg(long = "without-tag", value_name = "TAG")]
    pub without_tags: Vec<String>,

    /// Sort keys, comma separated; prefix with - for descending
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum rows to return
    #[arg(long)]
    pub limit: Option<u64>,

    /// Rows to skip
    #[arg(long)]
    pub skip: Option<u64>,

    /// Return one page (1-indexed) with the total count
    #[arg(long, conflicts_with_all = ["limit", "skip"])]
    pub page: Option<u32>,

    /// Rows per page with --page
    #[arg(long, default_value_t = 20)]
    pub per_page: u32,

    /// Print the SQL instead of running it
    #[arg(long)]
    pub sql_only: bool,
}

impl QueryArgs {
    pub fn to_filter(&self) -> Result<Filter> {
        let mut filter = match &self.json {
            Some(raw) => {
                let value: serde_json::Value =
                    serde_json::from_str(raw).context("--json is not valid JSON")?;
                Filter::from_json(value)?
            }
            None => Filter::new(),
        };

        for entry in &self.filters {
            let (key, value) = parse_key_value(entry)?;
            filter.insert(key, value);
        }

        let tags = parse_tags(&self.tags)?;
        if !tags.is_empty() {
            filter = filter.with_tags(TAGS, &tags);
        }
        let without = parse_tags(&self.without_tags)?;
        if !without.is_empty() {
            filter = filter.with_tags(TAGS_NOT_EXISTS, &without);
        }

        if let Some(sort) = &self.sort {
            filter.insert(SORT, sort.as_str());
        }
        if let Some(limit) = self.limit {
            filter.insert(LIMIT, clamp_i64(limit));
        }
        if let Some(skip) = self.skip {
            filter.insert(SKIP, clamp_i64(skip));
        }
        Ok(filter)
    }

    fn pagination(&self) -> Option<Pagination> {
        self.page.map(|page| Pagination::new(page, self.per_page))
    }
}

/// `key=value` → (key, parsed value)
pub fn parse_key_value(entry: &str) -> Result<(String, FilterValue)> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", entry))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty filter key in '{}'", entry));
    }
    Ok((key.to_string(), FilterValue::parse_cli(value)))
}

fn parse_tags(raw: &[String]) -> Result<Vec<Tag>> {
    raw.iter()
        .map(|s| Tag::parse(s).with_context(|| format!("invalid tag '{}'", s)))
        .collect()
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub async fn run_query(args: QueryArgs, config: &MealctlConfig) -> Result<()> {
    if args.sql_only {
        return run_explain(args, config);
    }

    let filter = args.to_filter()?;
    let pool = connect(config).await?;
    let output = for_entity!(args.entity, |E| {
        let repo = Repository::<E>::with_config(&pool, config.query);
        match args.pagination() {
            Some(page) => serde_json::to_string_pretty(&repo.query_page(&filter, page).await?)?,
            None => {
                let rows = repo.query(&filter).await?;
                info!(rows = rows.len(), "query complete");
                serde_json::to_string_pretty(&rows)?
            }
        }
    });

    println!("{}", output);
    Ok(())
}

pub async fn run_count(args: QueryArgs, config: &MealctlConfig) -> Result<()> {
    let filter = args.to_filter()?;

    if args.sql_only {
        let sql = for_entity!(args.entity, |E| {
            repo::select::<E>(&filter, &config.query)?.build_count()?.sql().to_owned()
        });
        println!("{}", sql);
        return Ok(());
    }

    let pool = connect(config).await?;
    let total = for_entity!(args.entity, |E| {
        Repository::<E>::with_config(&pool, config.query).count(&filter).await?
    });

    println!("{}", total);
    Ok(())
}

/// Print the SELECT a query would run. Needs no database.
pub fn run_explain(args: QueryArgs, config: &MealctlConfig) -> Result<()> {
    let mut filter = args.to_filter()?;
    if let Some(page) = args.pagination() {
        filter.insert(LIMIT, i64::from(page.limit()));
        filter.insert(SKIP, clamp_i64(page.skip()));
    }

    let sql = for_entity!(args.entity, |E| repo::explain::<E>(&filter, &config.query)?);
    println!("{}", sql);
    Ok(())
}
