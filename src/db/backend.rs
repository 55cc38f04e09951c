//! Storage backend abstraction.
//!
//! Repositories and the migration runner only see [`Backend`]; the SQLite and
//! document implementations live in `db::sqlite` and `db::document`.

use async_trait::async_trait;

use crate::db::query::{FilterSet, Pagination, Sort};
use crate::db::value::{DbValue, Row};
use crate::error::StoreError;

/// Static description of one table (or collection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// Prefix of generated identifiers.
    pub id_prefix: &'static str,
    /// Table carries a nullable `deleted_at` column.
    pub soft_delete: bool,
    /// Single-column unique keys besides `id`.
    pub unique: &'static [&'static str],
}

/// `column = value` in a `SET` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: &'static str,
    pub value: DbValue,
}

impl Assignment {
    pub fn new(column: &'static str, value: impl Into<DbValue>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name reported by health checks (`sqlite`, `document`).
    fn name(&self) -> &'static str;

    /// Trivial round trip.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Releases the underlying resources. Further calls fail.
    async fn close(&self);

    /// Applies one schema statement.
    async fn apply_schema(&self, statement: &str) -> Result<(), StoreError>;

    /// Inserts `row` and returns the stored row.
    async fn insert(&self, table: &TableSpec, row: Row) -> Result<Row, StoreError>;

    async fn find_one(&self, table: &TableSpec, filters: &FilterSet)
    -> Result<Option<Row>, StoreError>;

    async fn find_many(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
        sort: Option<&Sort>,
        window: Option<&Pagination>,
    ) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, table: &TableSpec, filters: &FilterSet) -> Result<u64, StoreError>;

    /// Updates the row with primary key `id` if it also matches `guard`.
    /// Returns the updated row, or `None` when nothing matched.
    async fn update_by_id(
        &self,
        table: &TableSpec,
        id: &str,
        guard: &FilterSet,
        set: &[Assignment],
    ) -> Result<Option<Row>, StoreError>;

    /// Updates every row matching `filters`; returns the affected count.
    async fn update_where(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
        set: &[Assignment],
    ) -> Result<u64, StoreError>;

    /// `column = column + delta` on the row with primary key `id`, also applying `set`.
    async fn increment(
        &self,
        table: &TableSpec,
        id: &str,
        guard: &FilterSet,
        column: &'static str,
        delta: i64,
        set: &[Assignment],
    ) -> Result<u64, StoreError>;

    /// Physically removes matching rows; returns the affected count.
    async fn delete_where(&self, table: &TableSpec, filters: &FilterSet)
    -> Result<u64, StoreError>;
}
