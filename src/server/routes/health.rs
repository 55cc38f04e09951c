use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::db::HealthReport;
use crate::server::router::AppState;

fn respond(report: HealthReport) -> impl IntoResponse {
    let status = if report.status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Passive probe: reports `disconnected` until something has connected.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    respond(state.db().health_check().await)
}

/// Connects if needed, then probes.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    // A failed connect leaves the manager disconnected; the probe reports it.
    let _ = state.db().handle().await;
    respond(state.db().health_check().await)
}
