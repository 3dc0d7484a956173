//! Filter dictionary DSL
//!
//! A `Filter` is an ordered map of filter keys to operands. Most keys name
//! a column (optionally with an operator postfix, see [`FilterOperator`]);
//! a handful of reserved keys steer paging, sorting and the repository
//! mixins instead.

pub mod mapper;
pub mod operator;
pub mod value;

use std::collections::BTreeMap;

use serde::de::{Deserialize, Deserializer};

pub use mapper::{ColumnSpec, FilterColumnMapper, FilterSchema, Join, ResolvedKey};
pub use operator::FilterOperator;
pub use value::{ColumnType, FilterValue};

use crate::error::FilterError;
use crate::models::Tag;

pub const LIMIT: &str = "limit";
pub const SKIP: &str = "skip";
pub const SORT: &str = "sort";
pub const DISCARDED: &str = "discarded";
pub const TAGS: &str = "tags";
pub const TAGS_NOT_EXISTS: &str = "tags_not_exists";

/// Keys consumed by the query layer rather than mapped to columns
pub const RESERVED_KEYS: &[&str] = &[LIMIT, SKIP, SORT, DISCARDED, TAGS, TAGS_NOT_EXISTS];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Filter dictionary, iterated in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    entries: BTreeMap<String, FilterValue>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// # Example
    /// ```
    /// use mealctl_core::filter::Filter;
    ///
    /// let filter = Filter::new().with("total_time_lte", 30i64).with("limit", 10i64);
    /// assert_eq!(filter.columns().count(), 1);
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Option<FilterValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries that name columns (reserved keys skipped).
    pub fn columns(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.iter().filter(|(k, _)| !is_reserved(k))
    }

    /// Builder-style tag constraint under `tags` or `tags_not_exists`.
    pub fn with_tags(mut self, key: &'static str, tags: &[Tag]) -> Self {
        let value = FilterValue::List(tags.iter().map(|t| FilterValue::Text(t.to_string())).collect());
        self.insert(key, value);
        self
    }

    /// Build from a JSON object, e.g. an API query body.
    pub fn from_json(value: serde_json::Value) -> Result<Self, FilterError> {
        let serde_json::Value::Object(map) = value else {
            return Err(FilterError::invalid_value("<filter>", "expected a JSON object"));
        };

        let mut filter = Self::new();
        for (key, v) in map {
            let parsed = FilterValue::from_json(&key, v)?;
            filter.entries.insert(key, parsed);
        }
        Ok(filter)
    }

    /// `limit`, if present.
    pub fn limit(&self) -> Result<Option<u64>, FilterError> {
        self.non_negative(LIMIT)
    }

    /// `skip`, if present.
    pub fn skip(&self) -> Result<Option<u64>, FilterError> {
        self.non_negative(SKIP)
    }

    fn non_negative(&self, key: &str) -> Result<Option<u64>, FilterError> {
        match self.get(key) {
            None | Some(FilterValue::Null) => Ok(None),
            Some(v) => match v.clone().coerce(key, ColumnType::Int)? {
                FilterValue::Int(n) if n >= 0 => Ok(Some(n as u64)),
                _ => Err(FilterError::invalid_value(key, "expected a non-negative integer")),
            },
        }
    }

    /// Tags under `key` (`tags` or `tags_not_exists`). Accepts `key::value[@author]`
    /// strings or `[key, value, author?]` lists.
    pub fn tags(&self, key: &str) -> Result<Vec<Tag>, FilterError> {
        let items = match self.get(key) {
            None | Some(FilterValue::Null) => return Ok(Vec::new()),
            Some(FilterValue::List(items)) if is_single_tuple(items) => vec![FilterValue::List(items.clone())],
            Some(FilterValue::List(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        };

        items.into_iter().map(|item| tag_from_value(key, item)).collect()
    }
}

/// `["diet", "vegan"]` is one tag, not two.
fn is_single_tuple(items: &[FilterValue]) -> bool {
    (2..=3).contains(&items.len())
        && items.iter().all(|v| matches!(v, FilterValue::Text(s) if !s.contains("::")))
}

fn tag_from_value(key: &str, value: FilterValue) -> Result<Tag, FilterError> {
    let invalid = |reason: String| FilterError::invalid_value(key, reason);

    match value {
        FilterValue::Text(s) => Tag::parse(&s).map_err(|e| invalid(e.to_string())),
        FilterValue::List(parts) => {
            let texts: Vec<String> = parts
                .into_iter()
                .map(|p| match p {
                    FilterValue::Text(s) => Ok(s),
                    FilterValue::Uuid(u) => Ok(u.to_string()),
                    FilterValue::Null => Ok(String::new()),
                    other => Err(invalid(format!("tag parts must be text, got {}", other.kind()))),
                })
                .collect::<Result<_, _>>()?;

            let tag = match texts.as_slice() {
                [k, v] => Tag::new(k.as_str(), v.as_str(), None),
                [k, v, author] => Tag::new(k.as_str(), v.as_str(), Some(author.clone())),
                _ => return Err(invalid("expected [key, value] or [key, value, author]".into())),
            };
            tag.map_err(|e| invalid(e.to_string()))
        }
        other => Err(invalid(format!("expected a tag, got {}", other.kind()))),
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filter = Self::new();
        for (k, v) in iter {
            filter.insert(k, v);
        }
        filter
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(serde::de::Error::custom)
    }
}
