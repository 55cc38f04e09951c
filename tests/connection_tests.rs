use async_trait::async_trait;
use nawth::db::{
    Backend, ConnectionManager, ConnectionState, Connector, DocumentBackend, HealthStatus,
};
use nawth::error::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Hands out in-memory document stores, failing the first `failures` attempts.
#[derive(Clone, Default)]
struct CountingConnector {
    attempts: Arc<AtomicUsize>,
    failures: usize,
    delay: Option<Duration>,
}

#[async_trait]
impl Connector for CountingConnector {
    fn backend_name(&self) -> &'static str {
        "document"
    }

    async fn connect(&self) -> Result<Arc<dyn Backend>, StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if attempt < self.failures {
            return Err(StoreError::UnexpectedError("connection refused".into()));
        }
        Ok(Arc::new(DocumentBackend::in_memory()))
    }
}

/// Connects to a store that is already closed, so every ping fails.
struct ClosedStoreConnector;

#[async_trait]
impl Connector for ClosedStoreConnector {
    fn backend_name(&self) -> &'static str {
        "document"
    }

    async fn connect(&self) -> Result<Arc<dyn Backend>, StoreError> {
        let store = DocumentBackend::in_memory();
        store.close().await;
        Ok(Arc::new(store))
    }
}

#[tokio::test]
async fn concurrent_first_use_connects_once() {
    let connector = CountingConnector {
        delay: Some(Duration::from_millis(20)),
        ..Default::default()
    };
    let attempts = connector.attempts.clone();
    let manager = Arc::new(ConnectionManager::new(connector));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.handle().await.map(|_| ()) })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), ConnectionState::Connected);

    let a = manager.handle().await.unwrap();
    let b = manager.handle().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn health_follows_connection_state() {
    let manager = ConnectionManager::new(CountingConnector::default());
    assert_eq!(manager.state(), ConnectionState::Uninitialized);

    let report = manager.health_check().await;
    assert_eq!(report.status, HealthStatus::Disconnected);
    assert_eq!(report.backend, "document");

    manager.handle().await.unwrap();
    assert_eq!(manager.health_check().await.status, HealthStatus::Healthy);

    manager.disconnect().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.health_check().await.status, HealthStatus::Disconnected);

    // Second disconnect is a no-op.
    manager.disconnect().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn failed_connect_is_reported_and_retried() {
    let connector = CountingConnector {
        failures: 1,
        ..Default::default()
    };
    let attempts = connector.attempts.clone();
    let manager = ConnectionManager::new(connector);

    let err = manager.handle().await.err().unwrap();
    assert!(matches!(err, StoreError::ConnectionFailed(_)), "{err:?}");
    assert_eq!(err.code(), "DATABASE_CONNECTION_FAILED");
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.health_check().await.status, HealthStatus::Disconnected);

    manager.handle().await.unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn slow_connect_times_out() {
    let connector = CountingConnector {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let manager = ConnectionManager::new(connector).with_connect_timeout(Duration::from_millis(50));

    let err = manager.handle().await.err().unwrap();
    assert!(matches!(err, StoreError::ConnectionFailed(_)));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn config_connector_opens_sqlite_memory() {
    let cfg = nawth::config::DatabaseConfig::sqlite("sqlite::memory:");
    let manager = ConnectionManager::from_config(&cfg);
    assert_eq!(manager.backend_name(), "sqlite");

    let backend = manager.handle().await.unwrap();
    assert_eq!(backend.name(), "sqlite");
    assert_eq!(manager.health_check().await.status, HealthStatus::Healthy);
    manager.disconnect().await;
}

#[tokio::test]
async fn failing_ping_is_unhealthy() {
    let manager = ConnectionManager::new(ClosedStoreConnector);
    manager.handle().await.unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);

    let report = manager.health_check().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(!report.status.is_healthy());
}

#[tokio::test]
async fn health_check_does_not_wait_for_connect() {
    let connector = CountingConnector {
        delay: Some(Duration::from_millis(500)),
        ..Default::default()
    };
    let manager = Arc::new(ConnectionManager::new(connector));

    let connecting = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.handle().await.map(|_| ()) })
    };
    while manager.state() != ConnectionState::Connecting {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let report = tokio::time::timeout(Duration::from_millis(100), manager.health_check())
        .await
        .expect("health check blocked on connect");
    assert_eq!(report.status, HealthStatus::Disconnected);

    connecting.await.unwrap().unwrap();
    assert_eq!(manager.health_check().await.status, HealthStatus::Healthy);
}
