use crate::{websocket::handler::{websocket_handler, websocket_path_handler}, AppState};
use axum::{routing::get, Router};

/// Create the WebSocket relay routes
pub fn create_ws_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/ws", get(websocket_handler))
        .route("/ws/:document_id", get(websocket_path_handler))
        .with_state(state)
}
