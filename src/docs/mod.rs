use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Registry and process diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Sessions attached to a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}/sessions",
    params(
        ("document_id" = String, Path, description = "Document identifier")
    ),
    responses(
        (status = 200, description = "Active sessions", body = DocumentSessionsResponse),
        (status = 404, description = "No active sessions", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_sessions_doc() {}

/// Attach to a document and relay frames to its other sessions
#[utoipa::path(
    get,
    path = "/ws",
    params(ConnectParams),
    responses(
        (status = 101, description = "Switching to the WebSocket protocol"),
        (status = 400, description = "Missing document or user ID, or not an upgrade request", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn websocket_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        doc_sessions_doc,
        websocket_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, DocumentSessionsResponse, SessionInfo, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
