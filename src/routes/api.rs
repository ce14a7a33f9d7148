use crate::{handlers::{diagnostics, doc_sessions, health_check, ready_check}, AppState};
use axum::{routing::get, Router};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/documents/:document_id/sessions", get(doc_sessions))
        .with_state(state)
}
