//! Backend-neutral column values and rows.
//!
//! Both backends translate their native representation into [`Row`] so the
//! record codec only ever deals with four storage classes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single stored value. Mirrors SQLite's storage classes (minus BLOB).
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "REAL counters are whole numbers; the float-to-int cast saturates"
    )]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DbValue::Integer(i) => Some(*i),
            DbValue::Real(r) => Some(*r as i64),
            DbValue::Text(s) => s.trim().parse().ok(),
            DbValue::Null => None,
        }
    }

    #[allow(clippy::cast_precision_loss, reason = "SQLite compares mixed numerics as REAL")]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DbValue::Integer(i) => Some(*i as f64),
            DbValue::Real(r) => Some(*r),
            DbValue::Text(s) => s.trim().parse().ok(),
            DbValue::Null => None,
        }
    }

    /// Ordering used by the document backend. Follows SQLite's cross-class
    /// rules: NULL < numbers < text.
    pub fn cmp_sql(&self, other: &DbValue) -> Ordering {
        fn rank(v: &DbValue) -> u8 {
            match v {
                DbValue::Null => 0,
                DbValue::Integer(_) | DbValue::Real(_) => 1,
                DbValue::Text(_) => 2,
            }
        }
        match (self, other) {
            (DbValue::Integer(a), DbValue::Integer(b)) => a.cmp(b),
            (DbValue::Text(a), DbValue::Text(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            DbValue::Null => Value::Null,
            DbValue::Integer(i) => Value::from(*i),
            DbValue::Real(r) => serde_json::Number::from_f64(*r)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DbValue::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => DbValue::Null,
            Value::Bool(b) => DbValue::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DbValue::Integer(i),
                None => DbValue::Real(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => DbValue::Text(s.clone()),
            other => DbValue::Text(other.to_string()),
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix, so that text order
/// equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<&String> for DbValue {
    fn from(v: &String) -> Self {
        DbValue::Text(v.clone())
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Integer(i64::from(v))
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Real(v)
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Integer(i64::from(v))
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(v: DateTime<Utc>) -> Self {
        DbValue::Text(format_timestamp(&v))
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DbValue::Null)
    }
}

/// One stored record, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, DbValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<DbValue>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Missing columns read as `NULL`.
    pub fn get(&self, column: &str) -> &DbValue {
        self.columns.get(column).unwrap_or(&DbValue::Null)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DbValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Map<String, Value> {
        self.columns
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    pub fn from_json(doc: &serde_json::Map<String, Value>) -> Self {
        Self {
            columns: doc
                .iter()
                .map(|(k, v)| (k.clone(), DbValue::from_json(v)))
                .collect(),
        }
    }
}

impl FromIterator<(String, DbValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, DbValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_classes() {
        assert_eq!(
            DbValue::Integer(20).cmp_sql(&DbValue::Real(10.5)),
            Ordering::Greater
        );
        assert_eq!(
            DbValue::Null.cmp_sql(&DbValue::Integer(0)),
            Ordering::Less
        );
        assert_eq!(
            DbValue::Real(1e9).cmp_sql(&DbValue::Text("0".into())),
            Ordering::Less
        );
    }

    #[test]
    fn timestamps_sort_as_text() {
        let a = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = a + chrono::Duration::milliseconds(5);
        assert_eq!(format_timestamp(&a), "2024-01-02T03:04:05.000Z");
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }
}
