use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which storage engine backs the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    /// In-process JSON document store, optionally snapshotted to disk.
    Document,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Document => "document",
        }
    }
}

/// Storage configuration (see `database` table in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// TOML: `database.backend`. Default: `sqlite`.
    #[serde(default)]
    pub backend: BackendKind,

    /// SQLite connection URL.
    /// TOML: `database.url`. Default: `sqlite://data.db`.
    #[serde(default = "default_url")]
    pub url: String,

    /// Snapshot file for the document backend. `None` keeps it memory-only.
    /// TOML: `database.document_path`.
    #[serde(default)]
    pub document_path: Option<PathBuf>,

    /// TOML: `database.max_connections`. Default: `5`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound on establishing the first connection.
    /// TOML: `database.connect_timeout_secs`. Default: `10`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// SQLite `busy_timeout`.
    /// TOML: `database.busy_timeout_secs`. Default: `5`.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Apply pending migrations at startup.
    /// TOML: `database.run_migrations`. Default: `true`.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            url: default_url(),
            document_path: None,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            busy_timeout_secs: default_busy_timeout_secs(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl DatabaseConfig {
    /// SQLite config for the given URL with every other field defaulted.
    pub fn sqlite(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Document backend config, memory-only when `path` is `None`.
    pub fn document(path: Option<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Document,
            document_path: path,
            ..Self::default()
        }
    }
}

fn default_url() -> String {
    "sqlite://data.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_run_migrations() -> bool {
    true
}
