//! Filter operands and column types

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::FilterError;

/// Storage type of a filterable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Bool,
    Uuid,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Dynamically typed filter operand
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Operand kind used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert a JSON value. Objects have no filter meaning and are rejected.
    pub fn from_json(key: &str, value: serde_json::Value) -> Result<Self, FilterError> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().ok_or_else(|| {
                    FilterError::invalid_value(key, format!("number {} out of range", n))
                })?),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(|v| Self::from_json(key, v))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => {
                return Err(FilterError::invalid_value(key, "objects are not valid operands"))
            }
        })
    }

    /// Parse a command-line operand: `null`, `true`/`false`, or text.
    /// Commas split the input into a list.
    pub fn parse_cli(raw: &str) -> Self {
        fn scalar(part: &str) -> FilterValue {
            match part.trim() {
                "null" => FilterValue::Null,
                "true" => FilterValue::Bool(true),
                "false" => FilterValue::Bool(false),
                other => FilterValue::Text(other.to_owned()),
            }
        }

        if raw.contains(',') {
            Self::List(raw.split(',').filter(|p| !p.trim().is_empty()).map(scalar).collect())
        } else {
            scalar(raw)
        }
    }

    /// Convert the operand to the column's storage type.
    pub fn coerce(self, key: &str, ty: ColumnType) -> Result<Self, FilterError> {
        let mismatch = |v: &FilterValue| {
            FilterError::invalid_value(key, format!("expected {}, got {}", ty, v.kind()))
        };

        match (self, ty) {
            (Self::Null, _) => Ok(Self::Null),
            (Self::List(items), _) => Ok(Self::List(
                items
                    .into_iter()
                    .map(|v| match v {
                        Self::List(_) => Err(FilterError::invalid_value(key, "nested lists are not valid operands")),
                        v => v.coerce(key, ty),
                    })
                    .collect::<Result<_, _>>()?,
            )),

            (v @ Self::Text(_), ColumnType::Text) => Ok(v),
            (v @ Self::Int(_), ColumnType::Int) => Ok(v),
            (v @ Self::Float(_), ColumnType::Float) => Ok(v),
            (v @ Self::Bool(_), ColumnType::Bool) => Ok(v),
            (v @ Self::Uuid(_), ColumnType::Uuid) => Ok(v),
            (v @ Self::Timestamp(_), ColumnType::Timestamp) => Ok(v),

            (Self::Int(i), ColumnType::Float) => Ok(Self::Float(i as f64)),
            (Self::Uuid(u), ColumnType::Text) => Ok(Self::Text(u.to_string())),

            (Self::Text(s), ColumnType::Int) => s
                .trim()
                .parse()
                .map(Self::Int)
                .map_err(|_| FilterError::invalid_value(key, format!("'{}' is not an integer", s))),
            (Self::Text(s), ColumnType::Float) => s
                .trim()
                .parse()
                .map(Self::Float)
                .map_err(|_| FilterError::invalid_value(key, format!("'{}' is not a number", s))),
            (Self::Text(s), ColumnType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(Self::Bool(true)),
                "false" | "f" | "0" | "no" => Ok(Self::Bool(false)),
                _ => Err(FilterError::invalid_value(key, format!("'{}' is not a boolean", s))),
            },
            (Self::Text(s), ColumnType::Uuid) => Uuid::parse_str(s.trim())
                .map(Self::Uuid)
                .map_err(|_| FilterError::invalid_value(key, format!("'{}' is not a uuid", s))),
            (Self::Text(s), ColumnType::Timestamp) => parse_timestamp(&s)
                .map(Self::Timestamp)
                .ok_or_else(|| {
                    FilterError::invalid_value(key, format!("'{}' is not an RFC 3339 timestamp or date", s))
                }),

            (other, _) => Err(mismatch(&other)),
        }
    }

    /// Push this operand as one bind parameter. `Null` renders as a literal;
    /// a list binds as a single typed array.
    pub(crate) fn push_bind(self, key: &str, qb: &mut QueryBuilder<'static, Postgres>) -> Result<(), FilterError> {
        match self {
            Self::Null => {
                qb.push("NULL");
            }
            Self::Bool(b) => {
                qb.push_bind(b);
            }
            Self::Int(i) => {
                qb.push_bind(i);
            }
            Self::Float(f) => {
                qb.push_bind(f);
            }
            Self::Text(s) => {
                qb.push_bind(s);
            }
            Self::Uuid(u) => {
                qb.push_bind(u);
            }
            Self::Timestamp(t) => {
                qb.push_bind(t);
            }
            Self::List(items) => ArrayBind::from_values(key, items)?.push(qb),
        }
        Ok(())
    }
}

/// Homogeneous list operand, bound as one Postgres array
#[derive(Debug)]
enum ArrayBind {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    Uuid(Vec<Uuid>),
    Timestamp(Vec<DateTime<Utc>>),
}

impl ArrayBind {
    fn from_values(key: &str, items: Vec<FilterValue>) -> Result<Self, FilterError> {
        let kind = items
            .first()
            .map(FilterValue::kind)
            .ok_or_else(|| FilterError::invalid_value(key, "cannot bind an empty list"))?;

        Ok(match kind {
            "bool" => Self::Bool(collect(key, items, |v| match v {
                FilterValue::Bool(b) => Some(b),
                _ => None,
            })?),
            "int" => Self::Int(collect(key, items, |v| match v {
                FilterValue::Int(i) => Some(i),
                _ => None,
            })?),
            "float" => Self::Float(collect(key, items, |v| match v {
                FilterValue::Float(f) => Some(f),
                _ => None,
            })?),
            "text" => Self::Text(collect(key, items, |v| match v {
                FilterValue::Text(s) => Some(s),
                _ => None,
            })?),
            "uuid" => Self::Uuid(collect(key, items, |v| match v {
                FilterValue::Uuid(u) => Some(u),
                _ => None,
            })?),
            "timestamp" => Self::Timestamp(collect(key, items, |v| match v {
                FilterValue::Timestamp(t) => Some(t),
                _ => None,
            })?),
            other => {
                return Err(FilterError::invalid_value(
                    key,
                    format!("{} elements cannot be bound as an array", other),
                ))
            }
        })
    }

    fn push(self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::Bool(v) => {
                qb.push_bind(v);
            }
            Self::Int(v) => {
                qb.push_bind(v);
            }
            Self::Float(v) => {
                qb.push_bind(v);
            }
            Self::Text(v) => {
                qb.push_bind(v);
            }
            Self::Uuid(v) => {
                qb.push_bind(v);
            }
            Self::Timestamp(v) => {
                qb.push_bind(v);
            }
        }
    }
}

fn collect<T>(
    key: &str,
    items: Vec<FilterValue>,
    pick: impl Fn(FilterValue) -> Option<T>,
) -> Result<Vec<T>, FilterError> {
    items
        .into_iter()
        .map(|v| {
            let kind = v.kind();
            pick(v).ok_or_else(|| FilterError::invalid_value(key, format!("mixed list element {}", kind)))
        })
        .collect()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_scalars() {
        assert_eq!(FilterValue::from_json("k", json!(null)).unwrap(), FilterValue::Null);
        assert_eq!(FilterValue::from_json("k", json!(3)).unwrap(), FilterValue::Int(3));
        assert_eq!(FilterValue::from_json("k", json!(2.5)).unwrap(), FilterValue::Float(2.5));
        assert_eq!(
            FilterValue::from_json("k", json!(["a", 1])).unwrap(),
            FilterValue::List(vec![FilterValue::Text("a".into()), FilterValue::Int(1)])
        );
    }

    #[test]
    fn from_json_rejects_objects() {
        let err = FilterValue::from_json("name", json!({"a": 1})).unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));
    }

    #[test]
    fn parse_cli_values() {
        assert_eq!(FilterValue::parse_cli("null"), FilterValue::Null);
        assert_eq!(FilterValue::parse_cli("true"), FilterValue::Bool(true));
        assert_eq!(FilterValue::parse_cli("30"), FilterValue::Text("30".into()));
        assert_eq!(
            FilterValue::parse_cli("a, b,"),
            FilterValue::List(vec![FilterValue::Text("a".into()), FilterValue::Text("b".into())])
        );
    }

    #[test]
    fn coerce_text_to_column_types() {
        let v = FilterValue::Text("42".into()).coerce("k", ColumnType::Int).unwrap();
        assert_eq!(v, FilterValue::Int(42));

        let v = FilterValue::Text("no".into()).coerce("k", ColumnType::Bool).unwrap();
        assert_eq!(v, FilterValue::Bool(false));

        let id = Uuid::new_v4();
        let v = FilterValue::Text(id.to_string()).coerce("k", ColumnType::Uuid).unwrap();
        assert_eq!(v, FilterValue::Uuid(id));

        let v = FilterValue::Text("2024-03-01".into())
            .coerce("k", ColumnType::Timestamp)
            .unwrap();
        assert!(matches!(v, FilterValue::Timestamp(_)));
    }

    #[test]
    fn coerce_widens_int_to_float() {
        let v = FilterValue::Int(2).coerce("k", ColumnType::Float).unwrap();
        assert_eq!(v, FilterValue::Float(2.0));
    }

    #[test]
    fn coerce_lists_elementwise() {
        let v = FilterValue::parse_cli("1,2").coerce("k", ColumnType::Int).unwrap();
        assert_eq!(v, FilterValue::List(vec![FilterValue::Int(1), FilterValue::Int(2)]));
    }

    #[test]
    fn coerce_mismatch() {
        let err = FilterValue::Bool(true).coerce("total_time", ColumnType::Int).unwrap_err();
        assert_eq!(
            err,
            FilterError::invalid_value("total_time", "expected int, got bool")
        );

        let err = FilterValue::Text("abc".into()).coerce("id", ColumnType::Uuid).unwrap_err();
        assert!(err.to_string().contains("not a uuid"));
    }

    #[test]
    fn coerce_rejects_nested_lists() {
        let v = FilterValue::from_json("name", json!(["X", ["Y"]])).unwrap();
        let err = v.coerce("name", ColumnType::Text).unwrap_err();
        assert_eq!(err, FilterError::invalid_value("name", "nested lists are not valid operands"));

        let v = FilterValue::from_json("id", json!([[Uuid::nil().to_string()]])).unwrap();
        assert!(v.coerce("id", ColumnType::Uuid).is_err());
    }

    #[test]
    fn list_binds_as_one_parameter() {
        let ids: Vec<Uuid> = (0..70_000).map(|_| Uuid::new_v4()).collect();
        let mut qb = QueryBuilder::new("SELECT 1 WHERE x = ANY(");
        FilterValue::from(ids).push_bind("id", &mut qb).unwrap();
        qb.push(")");
        assert_eq!(qb.sql(), "SELECT 1 WHERE x = ANY($1)");
    }

    #[test]
    fn mixed_lists_do_not_bind() {
        let mut qb = QueryBuilder::new("");
        let v = FilterValue::List(vec![FilterValue::Int(1), FilterValue::Text("a".into())]);
        assert!(v.push_bind("k", &mut qb).is_err());

        let v = FilterValue::List(vec![FilterValue::List(vec![])]);
        assert!(v.push_bind("k", &mut qb).is_err());
    }

    #[test]
    fn option_into_null() {
        let v: FilterValue = Option::<i64>::None.into();
        assert!(v.is_null());
    }
}
