//! SQLite backend on a sqlx connection pool.

mod render;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::db::backend::{Assignment, Backend, TableSpec};
use crate::db::query::{FilterSet, Pagination, Sort};
use crate::db::value::{DbValue, Row};
use crate::error::StoreError;

pub use render::Statement;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Opens a pool for `cfg.url`, creating the database file if missing.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        let connect_opts = SqliteConnectOptions::from_str(cfg.url.as_str())
            .map_err(|e| StoreError::ConnectionFailed(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(cfg.busy_timeout_secs))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        // Every pooled connection to an in-memory URL is its own database.
        let in_memory = cfg.url.contains(":memory:") || cfg.url.contains("mode=memory");
        let mut pool_opts = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(cfg.connect_timeout_secs.max(1)));
        if in_memory {
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_opts
            .connect_with(connect_opts)
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("db connect failed: {e}")))?;

        info!(url = %cfg.url, max_connections = cfg.max_connections, "SQLite pool opened");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_all(&self, stmt: Statement) -> Result<Vec<Row>, StoreError> {
        let rows = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&self, stmt: Statement) -> Result<Option<Row>, StoreError> {
        let row = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn execute(&self, stmt: Statement) -> Result<u64, StoreError> {
        let result = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, params: &[DbValue]) -> SqliteQuery<'q> {
    for param in params {
        query = match param {
            DbValue::Null => query.bind(None::<String>),
            DbValue::Integer(i) => query.bind(*i),
            DbValue::Real(r) => query.bind(*r),
            DbValue::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

/// Converts by runtime storage class, not declared column type.
fn decode_row(row: &SqliteRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            DbValue::Null
        } else {
            let class = raw.type_info().name().to_string();
            match class.as_str() {
                "INTEGER" | "BOOLEAN" => DbValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" | "NUMERIC" => DbValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => {
                    let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
                    DbValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => DbValue::Text(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        out.set(column.name(), value);
    }
    Ok(out)
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("SQLite pool closed");
    }

    /// Runs the whole text as one multi-statement batch, so trigger bodies
    /// and literals may contain `;`.
    async fn apply_schema(&self, statement: &str) -> Result<(), StoreError> {
        sqlx::raw_sql(statement).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, table: &TableSpec, row: Row) -> Result<Row, StoreError> {
        let stmt = render::insert(table, &row);
        let stored = self.fetch_optional(stmt).await?.ok_or_else(|| {
            StoreError::UnexpectedError(format!("insert into {} returned no row", table.name))
        })?;
        debug!(table = table.name, id = ?stored.get("id"), "row inserted");
        Ok(stored)
    }

    async fn find_one(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
    ) -> Result<Option<Row>, StoreError> {
        let window = Pagination { page: 1, limit: 1 };
        self.fetch_optional(render::select(table, filters, None, Some(&window)))
            .await
    }

    async fn find_many(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
        sort: Option<&Sort>,
        window: Option<&Pagination>,
    ) -> Result<Vec<Row>, StoreError> {
        self.fetch_all(render::select(table, filters, sort, window))
            .await
    }

    async fn count(&self, table: &TableSpec, filters: &FilterSet) -> Result<u64, StoreError> {
        let stmt = render::count(table, filters);
        let total: i64 = bind_all(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn update_by_id(
        &self,
        table: &TableSpec,
        id: &str,
        guard: &FilterSet,
        set: &[Assignment],
    ) -> Result<Option<Row>, StoreError> {
        if set.is_empty() {
            return self.find_one(table, &guard.clone().eq("id", id)).await;
        }
        let updated = self
            .fetch_optional(render::update_by_id(table, id, guard, set))
            .await?;
        debug!(
            table = table.name,
            id,
            columns_set = set.len(),
            found = updated.is_some(),
            "row updated"
        );
        Ok(updated)
    }

    async fn update_where(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
        set: &[Assignment],
    ) -> Result<u64, StoreError> {
        if set.is_empty() {
            return Ok(0);
        }
        let affected = self
            .execute(render::update_where(table, filters, set))
            .await?;
        debug!(table = table.name, affected, "rows updated");
        Ok(affected)
    }

    async fn increment(
        &self,
        table: &TableSpec,
        id: &str,
        guard: &FilterSet,
        column: &'static str,
        delta: i64,
        set: &[Assignment],
    ) -> Result<u64, StoreError> {
        let affected = self
            .execute(render::increment(table, id, guard, column, delta, set))
            .await?;
        debug!(table = table.name, id, column, delta, affected, "counter bumped");
        Ok(affected)
    }

    async fn delete_where(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
    ) -> Result<u64, StoreError> {
        let affected = self.execute(render::delete_where(table, filters)).await?;
        debug!(table = table.name, affected, "rows deleted");
        Ok(affected)
    }
}
