use axum::{extract::State, Json};
use crate::{models::HealthResponse, AppState};
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse::ok("Relay is running"))
}

/// Readiness check endpoint
pub async fn ready_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    // The registry lives in memory, so the relay is ready as soon as it serves.
    Json(HealthResponse::ok(format!(
        "{} ready with {} sessions in {} documents",
        state.config.service_name,
        state.registry.connection_count(),
        state.registry.document_count()
    )))
}
