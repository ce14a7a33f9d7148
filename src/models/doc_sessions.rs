use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One active session attached to a document
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
}

/// Response for listing a document's active sessions
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentSessionsResponse {
    pub document_id: String,
    pub sessions: Vec<SessionInfo>,
}
