//! Idempotent, fail-open schema migrations tracked in a `_migrations` ledger.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::db::backend::{Backend, TableSpec};
use crate::db::query::FilterSet;
use crate::db::value::Row;
use crate::error::StoreError;

/// One named schema change. The name is the ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    pub statement: &'static str,
}

impl Migration {
    pub const fn new(name: &'static str, statement: &'static str) -> Self {
        Self { name, statement }
    }
}

pub const LEDGER: TableSpec = TableSpec {
    name: "_migrations",
    id_prefix: "mig",
    soft_delete: false,
    unique: &["name"],
};

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    name TEXT UNIQUE NOT NULL,
    applied_at TEXT NOT NULL
)";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    /// `(name, error)` per failed migration.
    pub failed: Vec<(&'static str, String)>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct MigrationRunner<'a> {
    backend: &'a dyn Backend,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Applies pending migrations in order. A failing migration is logged and
    /// reported; later ones still run. Never returns an error.
    pub async fn run(&self, migrations: &[Migration]) -> MigrationReport {
        let mut report = MigrationReport::default();

        if let Err(e) = self.backend.apply_schema(LEDGER_DDL).await {
            warn!(error = %e, "migration ledger bootstrap failed");
            let reason = e.to_string();
            report.failed = migrations.iter().map(|m| (m.name, reason.clone())).collect();
            return report;
        }

        let mut seen = HashSet::new();
        for migration in migrations {
            let name = migration.name;
            if !seen.insert(name) {
                warn!(migration = name, "duplicate migration name, skipped");
                report.skipped.push(name);
                continue;
            }

            match self.is_applied(name).await {
                Ok(true) => {
                    debug!(migration = name, "already applied");
                    report.skipped.push(name);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(migration = name, error = %e, "cannot read migration ledger");
                    report.failed.push((name, e.to_string()));
                    continue;
                }
            }

            let result = match self.backend.apply_schema(migration.statement).await {
                Ok(()) => self.record(name).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    info!(migration = name, "migration applied");
                    report.applied.push(name);
                }
                Err(e) => {
                    warn!(migration = name, error = %e, "migration failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "migrations finished"
        );
        report
    }

    /// Ledger names in application order.
    pub async fn applied(&self) -> Result<Vec<String>, StoreError> {
        let mut rows = self
            .backend
            .find_many(&LEDGER, &FilterSet::new(), None, None)
            .await?;
        rows.sort_by(|a, b| a.get("applied_at").cmp_sql(b.get("applied_at")));
        Ok(rows
            .iter()
            .filter_map(|r| r.get("name").as_str().map(str::to_string))
            .collect())
    }

    async fn is_applied(&self, name: &str) -> Result<bool, StoreError> {
        let found = self
            .backend
            .find_one(&LEDGER, &FilterSet::new().eq("name", name))
            .await?;
        Ok(found.is_some())
    }

    async fn record(&self, name: &'static str) -> Result<(), StoreError> {
        let row = Row::new().with("name", name).with("applied_at", Utc::now());
        self.backend.insert(&LEDGER, row).await?;
        Ok(())
    }
}
