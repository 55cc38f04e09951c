//! Row <-> entity mapping.
//!
//! Blob fields (objects and arrays stored as JSON text) and 0/1 boolean
//! columns are handled here and nowhere else. Blob decoding never fails: a
//! `NULL`, missing or malformed value decodes to `{}` or `[]`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;
use tracing::debug;

use crate::db::backend::{Assignment, TableSpec};
use crate::db::query::SortOrder;
use crate::db::value::{DbValue, Row};
use crate::error::StoreError;
use nawth_schema::JsonObject;

/// Storage mapping of one entity type.
pub trait Record: Sized + Send + Sync + 'static {
    /// Creation payload (no id, no timestamps).
    type New: Send + Sync;
    /// Partial update payload; `None` fields are left untouched.
    type Patch: Send + Sync;

    const TABLE: TableSpec;
    /// Columns callers may filter on.
    const FILTERABLE: &'static [&'static str];
    /// `(logical key, physical column)` pairs callers may sort by.
    const SORTABLE: &'static [(&'static str, &'static str)];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("created_at", SortOrder::Desc);
    /// Integer columns that may be bumped with `col = col + delta`.
    const COUNTERS: &'static [&'static str] = &[];

    fn decode(row: &Row) -> Result<Self, StoreError>;

    /// Every domain column of a new row.
    fn encode_new(new: Self::New) -> Vec<Assignment>;

    /// Only the columns present in `patch`.
    fn encode_patch(patch: &Self::Patch) -> Vec<Assignment>;

    /// Extra columns written alongside `deleted_at` on soft delete.
    fn soft_delete_assignments() -> Vec<Assignment> {
        Vec::new()
    }
}

/// `<prefix>_<unix millis>_<12 hex chars>`.
pub fn new_id(prefix: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", Utc::now().timestamp_millis(), &random[..12])
}

/// Builds the full row for an insert: fresh `id` plus both timestamps.
pub fn insert_row<E: Record>(new: E::New, now: DateTime<Utc>) -> Row {
    let mut row = Row::new()
        .with("id", new_id(E::TABLE.id_prefix))
        .with("created_at", now)
        .with("updated_at", now);
    for Assignment { column, value } in E::encode_new(new) {
        row.set(column, value);
    }
    row
}

/// Patch columns followed by a refreshed `updated_at`.
pub fn update_assignments<E: Record>(patch: &E::Patch, now: DateTime<Utc>) -> Vec<Assignment> {
    let mut set = E::encode_patch(patch);
    set.retain(|a| a.column != "updated_at");
    set.push(Assignment::new("updated_at", now));
    set
}

pub fn encode_bool(value: bool) -> DbValue {
    DbValue::Integer(i64::from(value))
}

pub fn decode_bool(value: &DbValue) -> bool {
    match value {
        DbValue::Integer(i) => *i != 0,
        DbValue::Real(r) => *r != 0.0,
        DbValue::Text(s) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
        DbValue::Null => false,
    }
}

/// Serializes a blob. Falls back to `fallback` (`{}` or `[]`) if serde refuses.
pub fn encode_json<T: Serialize + ?Sized>(value: &T, fallback: &'static str) -> DbValue {
    match serde_json::to_string(value) {
        Ok(text) => DbValue::Text(text),
        Err(e) => {
            debug!(error = %e, "blob serialization failed, storing empty value");
            DbValue::Text(fallback.to_string())
        }
    }
}

pub fn encode_object(value: &JsonObject) -> DbValue {
    encode_json(value, "{}")
}

pub fn encode_array<T: Serialize>(value: &[T]) -> DbValue {
    encode_json(value, "[]")
}

fn decode_blob<T: DeserializeOwned + Default>(value: &DbValue) -> T {
    let DbValue::Text(text) = value else {
        return T::default();
    };
    match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "malformed blob, decoding as empty");
            T::default()
        }
    }
}

pub fn decode_object(value: &DbValue) -> JsonObject {
    decode_blob(value)
}

pub fn decode_array<T: DeserializeOwned>(value: &DbValue) -> Vec<T> {
    decode_blob(value)
}

/// Typed column access with decode errors naming the offending column.
pub struct RowReader<'a> {
    table: &'static str,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    pub fn new(table: &'static str, row: &'a Row) -> Self {
        Self { table, row }
    }

    fn error(&self, column: &'static str, reason: impl Into<String>) -> StoreError {
        StoreError::Decode {
            table: self.table,
            column,
            reason: reason.into(),
        }
    }

    pub fn opt_text(&self, column: &'static str) -> Option<String> {
        match self.row.get(column) {
            DbValue::Null => None,
            DbValue::Text(s) => Some(s.clone()),
            DbValue::Integer(i) => Some(i.to_string()),
            DbValue::Real(r) => Some(r.to_string()),
        }
    }

    pub fn text(&self, column: &'static str) -> Result<String, StoreError> {
        self.opt_text(column)
            .ok_or_else(|| self.error(column, "unexpected NULL"))
    }

    pub fn opt_int(&self, column: &'static str) -> Result<Option<i64>, StoreError> {
        let value = self.row.get(column);
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_i64()
            .map(Some)
            .ok_or_else(|| self.error(column, "not an integer"))
    }

    pub fn int(&self, column: &'static str) -> Result<i64, StoreError> {
        self.opt_int(column)?
            .ok_or_else(|| self.error(column, "unexpected NULL"))
    }

    pub fn real(&self, column: &'static str) -> Result<f64, StoreError> {
        self.row
            .get(column)
            .as_f64()
            .ok_or_else(|| self.error(column, "not a number"))
    }

    pub fn bool(&self, column: &'static str) -> bool {
        decode_bool(self.row.get(column))
    }

    pub fn opt_timestamp(&self, column: &'static str) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.opt_text(column) {
            None => Ok(None),
            Some(text) => DateTime::parse_from_rfc3339(&text)
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(|e| self.error(column, e.to_string())),
        }
    }

    pub fn timestamp(&self, column: &'static str) -> Result<DateTime<Utc>, StoreError> {
        self.opt_timestamp(column)?
            .ok_or_else(|| self.error(column, "unexpected NULL"))
    }

    pub fn parse<T>(&self, column: &'static str) -> Result<T, StoreError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let text = self.text(column)?;
        text.parse().map_err(|e: T::Err| self.error(column, e.to_string()))
    }

    pub fn object(&self, column: &'static str) -> JsonObject {
        decode_object(self.row.get(column))
    }

    pub fn array<T: DeserializeOwned>(&self, column: &'static str) -> Vec<T> {
        decode_array(self.row.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_blobs_decode_to_empty() {
        assert!(decode_object(&DbValue::Null).is_empty());
        assert!(decode_object(&DbValue::Text("{not json".into())).is_empty());
        assert!(decode_object(&DbValue::Text("[1,2]".into())).is_empty());
        assert!(decode_array::<String>(&DbValue::Text("".into())).is_empty());
        assert!(decode_array::<String>(&DbValue::Integer(3)).is_empty());
        assert!(decode_array::<String>(&DbValue::Text("{\"a\":1}".into())).is_empty());
    }

    #[test]
    fn blobs_round_trip() {
        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(decode_array::<String>(&encode_array(&tags)), tags);

        let obj = json!({"theme": "dark", "n": 3}).as_object().unwrap().clone();
        assert_eq!(decode_object(&encode_object(&obj)), obj);
    }

    #[test]
    fn booleans_are_zero_or_one() {
        assert_eq!(encode_bool(true), DbValue::Integer(1));
        assert_eq!(encode_bool(false), DbValue::Integer(0));
        assert!(decode_bool(&DbValue::Integer(7)));
        assert!(!decode_bool(&DbValue::Integer(0)));
        assert!(!decode_bool(&DbValue::Null));
    }

    #[test]
    fn ids_carry_prefix_and_differ() {
        let a = new_id("user");
        let b = new_id("user");
        assert!(a.starts_with("user_"));
        assert_ne!(a, b);
    }

    #[test]
    fn reader_reports_column_on_bad_timestamp() {
        let row = Row::new().with("created_at", "yesterday");
        let err = RowReader::new("users", &row)
            .timestamp("created_at")
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Decode {
                table: "users",
                column: "created_at",
                ..
            }
        ));
    }
}
