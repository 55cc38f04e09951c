//! Lazily established, shared storage handle.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{BackendKind, DatabaseConfig};
use crate::db::backend::Backend;
use crate::db::document::DocumentBackend;
use crate::db::health::{self, HealthReport};
use crate::db::sqlite::SqliteBackend;
use crate::error::StoreError;

/// Opens a new backend handle.
#[async_trait]
pub trait Connector: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn connect(&self) -> Result<Arc<dyn Backend>, StoreError>;
}

/// Picks the backend named by [`DatabaseConfig::backend`].
pub struct ConfigConnector {
    cfg: DatabaseConfig,
}

impl ConfigConnector {
    pub fn new(cfg: DatabaseConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Connector for ConfigConnector {
    fn backend_name(&self) -> &'static str {
        self.cfg.backend.as_str()
    }

    async fn connect(&self) -> Result<Arc<dyn Backend>, StoreError> {
        match self.cfg.backend {
            BackendKind::Sqlite => Ok(Arc::new(SqliteBackend::connect(&self.cfg).await?)),
            BackendKind::Document => match &self.cfg.document_path {
                Some(path) => Ok(Arc::new(DocumentBackend::open(path).await?)),
                None => Ok(Arc::new(DocumentBackend::in_memory())),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Uninitialized = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnected,
            _ => ConnectionState::Uninitialized,
        }
    }
}

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns at most one live backend handle, shared by every repository.
///
/// The first [`handle`](Self::handle) call connects; concurrent first callers
/// wait on the same attempt. A failed attempt leaves the manager
/// `Disconnected` and the next call retries.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    handle: RwLock<Option<Arc<dyn Backend>>>,
    state: AtomicU8,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            handle: RwLock::new(None),
            state: AtomicU8::new(ConnectionState::Uninitialized as u8),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn from_config(cfg: &DatabaseConfig) -> Self {
        Self::new(ConfigConnector::new(cfg.clone()))
            .with_connect_timeout(Duration::from_secs(cfg.connect_timeout_secs.max(1)))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn backend_name(&self) -> &'static str {
        self.connector.backend_name()
    }

    /// Returns the live handle, connecting on first use.
    pub async fn handle(&self) -> Result<Arc<dyn Backend>, StoreError> {
        if let Some(backend) = self.handle.read().await.as_ref() {
            return Ok(backend.clone());
        }

        let mut slot = self.handle.write().await;
        if let Some(backend) = slot.as_ref() {
            return Ok(backend.clone());
        }

        self.set_state(ConnectionState::Connecting);
        let backend = self.backend_name();
        match tokio::time::timeout(self.connect_timeout, self.connector.connect()).await {
            Ok(Ok(handle)) => {
                *slot = Some(handle.clone());
                self.set_state(ConnectionState::Connected);
                info!(backend, "database connected");
                Ok(handle)
            }
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(backend, error = %e, "database connection failed");
                Err(match e {
                    StoreError::ConnectionFailed(_) => e,
                    other => StoreError::ConnectionFailed(other.to_string()),
                })
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(backend, timeout = ?self.connect_timeout, "database connection timed out");
                Err(StoreError::ConnectionFailed(format!(
                    "connect timed out after {:?}",
                    self.connect_timeout
                )))
            }
        }
    }

    /// Probes the current handle without connecting. Never waits on an
    /// in-flight connect: while one holds the slot the report is
    /// `disconnected`.
    pub async fn health_check(&self) -> HealthReport {
        let handle = match self.handle.try_read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        health::probe(handle.as_deref(), self.backend_name()).await
    }

    /// Closes and drops the handle. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let mut slot = self.handle.write().await;
        if let Some(backend) = slot.take() {
            backend.close().await;
            self.set_state(ConnectionState::Disconnected);
            info!(backend = self.backend_name(), "database disconnected");
        }
    }
}
