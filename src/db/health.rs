use serde::Serialize;
use tracing::warn;

use crate::db::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Disconnected,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Body of the health endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub backend: &'static str,
}

/// Probes `backend` (if any). Never fails: errors become `Unhealthy`.
pub async fn probe(backend: Option<&dyn Backend>, backend_name: &'static str) -> HealthReport {
    let status = match backend {
        None => HealthStatus::Disconnected,
        Some(b) => match b.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(backend = backend_name, error = %e, "health probe failed");
                HealthStatus::Unhealthy
            }
        },
    };
    HealthReport {
        status,
        backend: backend_name,
    }
}
