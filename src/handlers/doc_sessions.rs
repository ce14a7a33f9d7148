use crate::{models::{DocumentSessionsResponse, ErrorResponse, SessionInfo}, AppState};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::debug;

/// List the sessions currently attached to a document
pub async fn doc_sessions(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<DocumentSessionsResponse>), (StatusCode, Json<ErrorResponse>)> {

    let mut sessions = state.registry.sessions(&document_id);

    // An empty document and an unknown one are the same thing here
    if sessions.is_empty() {
        debug!("No active sessions for document '{}'", document_id);
        return Err(ErrorResponse::reply(
            StatusCode::NOT_FOUND,
            format!("Document '{}' has no active sessions", document_id),
        ));
    }

    sessions.sort_by_key(|session| session.connected_at());

    Ok((
        StatusCode::OK,
        Json(DocumentSessionsResponse {
            document_id,
            sessions: sessions
                .iter()
                .map(|session| SessionInfo {
                    session_id: session.id(),
                    user_id: session.user_id().to_string(),
                    connected_at: session.connected_at(),
                })
                .collect(),
        }),
    ))
}
