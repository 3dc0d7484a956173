//! `sort` filter key: `"name"`, `"-created_at"`, or a list of those

use std::fmt;

use crate::error::FilterError;
use crate::filter::{FilterValue, SORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub key: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// A leading `-` sorts descending, `+` or nothing ascending.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let raw = raw.trim();
        let (key, direction) = match raw.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Desc),
            None => (raw.strip_prefix('+').unwrap_or(raw), SortDirection::Asc),
        };

        if key.is_empty() {
            return Err(FilterError::invalid_sort(raw, "empty sort key"));
        }

        Ok(Self {
            key: key.to_owned(),
            direction,
        })
    }

    /// Sort keys from a `sort` operand. Duplicate keys keep their first position.
    pub fn from_value(value: Option<&FilterValue>) -> Result<Vec<Self>, FilterError> {
        let raw: Vec<&str> = match value {
            None | Some(FilterValue::Null) => return Ok(Vec::new()),
            Some(FilterValue::Text(s)) => s.split(',').collect(),
            Some(FilterValue::List(items)) => items
                .iter()
                .map(|v| match v {
                    FilterValue::Text(s) => Ok(s.as_str()),
                    other => Err(FilterError::invalid_value(SORT, format!("expected text, got {}", other.kind()))),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(FilterError::invalid_value(SORT, format!("expected text, got {}", other.kind())))
            }
        };

        let mut keys: Vec<Self> = Vec::with_capacity(raw.len());
        for part in raw.into_iter().filter(|p| !p.trim().is_empty()) {
            let parsed = Self::parse(part)?;
            if !keys.iter().any(|k| k.key == parsed.key) {
                keys.push(parsed);
            }
        }
        Ok(keys)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.key),
            SortDirection::Desc => write!(f, "-{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_directions() {
        assert_eq!(SortKey::parse("-name").unwrap().direction, SortDirection::Desc);
        assert_eq!(SortKey::parse("+name").unwrap().direction, SortDirection::Asc);
        let key = SortKey::parse("name").unwrap();
        assert_eq!(key.key, "name");
        assert_eq!(key.direction, SortDirection::Asc);
    }

    #[test]
    fn rejects_empty() {
        assert!(SortKey::parse("-").is_err());
        assert!(SortKey::parse("  ").is_err());
    }

    #[test]
    fn from_comma_list_and_array() {
        let keys = SortKey::from_value(Some(&FilterValue::Text("-created_at,name".into()))).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].to_string(), "-created_at");

        let keys = SortKey::from_value(Some(&vec!["name", "-name"].into())).unwrap();
        assert_eq!(keys, vec![SortKey::parse("name").unwrap()]);
    }

    #[test]
    fn rejects_non_text() {
        assert!(SortKey::from_value(Some(&FilterValue::Int(1))).is_err());
        assert!(SortKey::from_value(None).unwrap().is_empty());
    }
}
