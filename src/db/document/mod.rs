//! In-process document store.
//!
//! Collections are vectors of rows behind one `RwLock`. When a snapshot path
//! is configured the whole store is rewritten (tmp file + rename) after every
//! mutation and reloaded on connect. Unique keys from [`TableSpec::unique`]
//! are enforced; foreign keys are not.

mod matcher;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::db::backend::{Assignment, Backend, TableSpec};
use crate::db::query::{FilterSet, Pagination, Sort};
use crate::db::value::{DbValue, Row};
use crate::error::{ConstraintKind, StoreError};

type Collections = BTreeMap<String, Vec<Row>>;

pub struct DocumentBackend {
    collections: RwLock<Collections>,
    snapshot: Option<PathBuf>,
    closed: AtomicBool,
}

impl DocumentBackend {
    /// Memory-only store.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(Collections::new()),
            snapshot: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Opens (or starts) a store persisted at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let collections = match tokio::fs::read(&path).await {
            Ok(bytes) => load_snapshot(&bytes).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "unreadable document snapshot {}: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::new(),
            Err(e) => {
                return Err(StoreError::ConnectionFailed(format!(
                    "cannot open document snapshot {}: {e}",
                    path.display()
                )));
            }
        };
        info!(
            path = %path.display(),
            collections = collections.len(),
            "document store opened"
        );
        Ok(Self {
            collections: RwLock::new(collections),
            snapshot: Some(path),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::ConnectionFailed(
                "document store is closed".to_string(),
            ));
        }
        Ok(())
    }

    async fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        write_snapshot(path, collections).await
    }
}

fn load_snapshot(bytes: &[u8]) -> Result<Collections, serde_json::Error> {
    let raw: BTreeMap<String, Vec<Map<String, Value>>> = serde_json::from_slice(bytes)?;
    Ok(raw
        .into_iter()
        .map(|(name, docs)| (name, docs.iter().map(Row::from_json).collect()))
        .collect())
}

async fn write_snapshot(path: &Path, collections: &Collections) -> Result<(), StoreError> {
    let raw: BTreeMap<&str, Vec<Map<String, Value>>> = collections
        .iter()
        .map(|(name, rows)| (name.as_str(), rows.iter().map(Row::to_json).collect()))
        .collect();
    let bytes = serde_json::to_vec(&raw)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// `CREATE TABLE [IF NOT EXISTS] <name> ...` -> `<name>`.
fn created_table(statement: &str) -> Option<String> {
    let tokens: Vec<&str> = statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .flat_map(str::split_whitespace)
        .take(6)
        .collect();
    let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
    if upper.len() < 3 || upper[0] != "CREATE" || upper[1] != "TABLE" {
        return None;
    }
    let name = if upper.len() >= 6 && upper[2] == "IF" && upper[3] == "NOT" && upper[4] == "EXISTS" {
        tokens[5]
    } else {
        tokens[2]
    };
    let name = name
        .split('(')
        .next()
        .unwrap_or_default()
        .trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']');
    (!name.is_empty()).then(|| name.to_string())
}

/// Puts `previous` back at `idx` after a failed snapshot write.
fn restore_row(collections: &mut Collections, table: &TableSpec, idx: usize, previous: Row) {
    if let Some(slot) = collections.get_mut(table.name).and_then(|rows| rows.get_mut(idx)) {
        *slot = previous;
    }
}

fn apply(row: &mut Row, set: &[Assignment]) {
    for a in set {
        row.set(a.column, a.value.clone());
    }
}

/// Fails if `candidate` collides with any row other than `skip` on `id` or a
/// unique column.
fn check_unique(
    table: &TableSpec,
    rows: &[Row],
    candidate: &Row,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    let keys = std::iter::once("id").chain(table.unique.iter().copied());
    for column in keys {
        let value = candidate.get(column);
        if value.is_null() {
            continue;
        }
        let clash = rows
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .any(|(_, r)| r.get(column) == value);
        if clash {
            return Err(StoreError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                message: format!("UNIQUE constraint failed: {}.{column}", table.name),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl Backend for DocumentBackend {
    fn name(&self) -> &'static str {
        "document"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let _guard = self.collections.read().await;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        info!("document store closed");
    }

    async fn apply_schema(&self, statement: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        match created_table(statement) {
            Some(name) => {
                let mut collections = self.collections.write().await;
                if !collections.contains_key(&name) {
                    collections.insert(name.clone(), Vec::new());
                    if let Err(e) = self.persist(&collections).await {
                        collections.remove(&name);
                        return Err(e);
                    }
                    debug!(collection = %name, "collection created");
                }
            }
            None => debug!("schema statement has no document equivalent, skipped"),
        }
        Ok(())
    }

    async fn insert(&self, table: &TableSpec, row: Row) -> Result<Row, StoreError> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let created = !collections.contains_key(table.name);
        let rows = collections.entry(table.name.to_string()).or_default();
        check_unique(table, rows, &row, None)?;
        rows.push(row.clone());
        if let Err(e) = self.persist(&collections).await {
            if created {
                collections.remove(table.name);
            } else if let Some(rows) = collections.get_mut(table.name) {
                rows.pop();
            }
            return Err(e);
        }
        debug!(table = table.name, id = ?row.get("id"), "document inserted");
        Ok(row)
    }

    async fn find_one(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
    ) -> Result<Option<Row>, StoreError> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(table.name)
            .and_then(|rows| rows.iter().find(|r| matcher::matches(r, filters)))
            .cloned())
    }

    async fn find_many(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
        sort: Option<&Sort>,
        window: Option<&Pagination>,
    ) -> Result<Vec<Row>, StoreError> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        let Some(rows) = collections.get(table.name) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<&Row> = rows.iter().filter(|r| matcher::matches(r, filters)).collect();
        if let Some(sort) = sort {
            hits.sort_by(|a, b| matcher::compare(a, b, sort));
        }
        let (skip, take) = match window {
            Some(w) => (
                usize::try_from(w.offset()).unwrap_or(usize::MAX),
                usize::try_from(w.limit).unwrap_or(usize::MAX),
            ),
            None => (0, usize::MAX),
        };
        Ok(hits.into_iter().skip(skip).take(take).cloned().collect())
    }

    async fn count(&self, table: &TableSpec, filters: &FilterSet) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(table.name)
            .map(|rows| rows.iter().filter(|r| matcher::matches(r, filters)).count() as u64)
            .unwrap_or(0))
    }

    async fn update_by_id(
        &self,
        table: &TableSpec,
        id: &str,
        guard: &FilterSet,
        set: &[Assignment],
    ) -> Result<Option<Row>, StoreError> {
        self.ensure_open()?;
        let filters = guard.clone().eq("id", id);
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(table.name) else {
            return Ok(None);
        };
        let Some(idx) = rows.iter().position(|r| matcher::matches(r, &filters)) else {
            return Ok(None);
        };
        let mut updated = rows[idx].clone();
        apply(&mut updated, set);
        check_unique(table, rows, &updated, Some(idx))?;
        let previous = std::mem::replace(&mut rows[idx], updated.clone());
        if let Err(e) = self.persist(&collections).await {
            restore_row(&mut collections, table, idx, previous);
            return Err(e);
        }
        debug!(table = table.name, id, columns_set = set.len(), "document updated");
        Ok(Some(updated))
    }

    async fn update_where(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
        set: &[Assignment],
    ) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(table.name) else {
            return Ok(0);
        };
        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| matcher::matches(r, filters))
            .map(|(i, _)| i)
            .collect();

        // Validate every change before touching anything.
        let mut staged = rows.clone();
        for &i in &targets {
            apply(&mut staged[i], set);
        }
        for &i in &targets {
            check_unique(table, &staged, &staged[i], Some(i))?;
        }
        let previous = std::mem::replace(rows, staged);
        let affected = targets.len() as u64;
        if affected > 0 {
            if let Err(e) = self.persist(&collections).await {
                collections.insert(table.name.to_string(), previous);
                return Err(e);
            }
        }
        debug!(table = table.name, affected, "documents updated");
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
        self.ensure_open()?;
        let filters = guard.clone().eq("id", id);
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(table.name) else {
            return Ok(0);
        };
        let Some(idx) = rows.iter().position(|r| matcher::matches(r, &filters)) else {
            return Ok(0);
        };
        let previous = rows[idx].clone();
        let current = previous.get(column).as_i64().unwrap_or(0);
        rows[idx].set(column, DbValue::Integer(current.saturating_add(delta)));
        apply(&mut rows[idx], set);
        if let Err(e) = self.persist(&collections).await {
            restore_row(&mut collections, table, idx, previous);
            return Err(e);
        }
        debug!(table = table.name, id, column, delta, "counter bumped");
        Ok(1)
    }

    async fn delete_where(
        &self,
        table: &TableSpec,
        filters: &FilterSet,
    ) -> Result<u64, StoreError> {
        self.ensure_open()?;
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(table.name) else {
            return Ok(0);
        };
        let previous = rows.clone();
        rows.retain(|r| !matcher::matches(r, filters));
        let affected = (previous.len() - rows.len()) as u64;
        if affected > 0 {
            if let Err(e) = self.persist(&collections).await {
                collections.insert(table.name.to_string(), previous);
                return Err(e);
            }
        }
        debug!(table = table.name, affected, "documents deleted");
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_names() {
        assert_eq!(
            created_table("CREATE TABLE IF NOT EXISTS users (id TEXT PRIMARY KEY)"),
            Some("users".to_string())
        );
        assert_eq!(
            created_table("-- orders\ncreate table orders(id TEXT)"),
            Some("orders".to_string())
        );
        assert_eq!(
            created_table("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)"),
            None
        );
    }

    const PEOPLE: TableSpec = TableSpec {
        name: "people",
        id_prefix: "p",
        soft_delete: false,
        unique: &["email"],
    };

    fn person(id: &str, email: &str) -> Row {
        Row::new().with("id", id).with("email", email).with("visits", 0)
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_memory_untouched() {
        let dir = std::env::temp_dir().join(format!(
            "nawth_missing_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let store = DocumentBackend::open(dir.join("snapshot.json")).await.unwrap();
        let everyone = FilterSet::new();

        let err = store
            .apply_schema("CREATE TABLE people (id TEXT PRIMARY KEY)")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IoError(_)), "{err:?}");
        assert!(store.collections.read().await.is_empty());

        for _ in 0..2 {
            let err = store.insert(&PEOPLE, person("p1", "a@x")).await.unwrap_err();
            assert!(matches!(err, StoreError::IoError(_)), "{err:?}");
        }
        assert_eq!(store.count(&PEOPLE, &everyone).await.unwrap(), 0);

        // Seed memory directly, then check that every failing write rolls back.
        store
            .collections
            .write()
            .await
            .insert("people".into(), vec![person("p1", "a@x"), person("p2", "b@x")]);
        let only_p1 = FilterSet::new().eq("id", "p1");
        let set = [Assignment::new("email", "c@x")];

        assert!(store.update_by_id(&PEOPLE, "p1", &everyone, &set).await.is_err());
        assert!(store.update_where(&PEOPLE, &only_p1, &set).await.is_err());
        assert!(store
            .increment(&PEOPLE, "p1", &everyone, "visits", 1, &[])
            .await
            .is_err());
        assert!(store.delete_where(&PEOPLE, &only_p1).await.is_err());

        let rows = store.find_many(&PEOPLE, &everyone, None, None).await.unwrap();
        assert_eq!(rows, vec![person("p1", "a@x"), person("p2", "b@x")]);
    }

    #[tokio::test]
    async fn closed_store_refuses_work() {
        let store = DocumentBackend::in_memory();
        assert!(store.ping().await.is_ok());
        store.close().await;
        assert!(matches!(
            store.ping().await,
            Err(StoreError::ConnectionFailed(_))
        ));
    }
}
