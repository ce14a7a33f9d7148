
use axum::{
    extract::{Path, Query, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{future, SinkExt, StreamExt};
use tracing::{info, error, warn};

use crate::AppState;
use crate::models::{ConnectParams, ErrorResponse};
use crate::ws::{Frame, FrameSink, Inbound, RelayError, ValidationError};

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}

impl From<Message> for Inbound {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(text) => Inbound::Frame(Frame::Text(text)),
            Message::Binary(bytes) => Inbound::Frame(Frame::Binary(bytes)),
            Message::Ping(_) | Message::Pong(_) => Inbound::Control,
            Message::Close(_) => Inbound::Close,
        }
    }
}

/// WebSocket handler: `/ws?documentId=..&userId=..`
pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    connect(state, params.document_id, params.user_id, ws)
}

/// WebSocket handler with the document in the path: `/ws/{documentId}?userId=..`
pub async fn websocket_path_handler(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(params): Query<ConnectParams>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    connect(state, Some(document_id), params.user_id, ws)
}

/// Identifiers are checked before any upgrade is attempted.
fn connect(
    state: AppState,
    document_id: Option<String>,
    user_id: Option<String>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let document_id = document_id.unwrap_or_default();
    let user_id = user_id.unwrap_or_default();

    if let Err(e) = ValidationError::check(&document_id, &user_id) {
        warn!("Rejected WebSocket connection: {}", e);
        return ErrorResponse::reply(StatusCode::BAD_REQUEST, "Missing document or user ID").into_response();
    }

    let Some(ws) = ws else {
        return ErrorResponse::reply(StatusCode::BAD_REQUEST, "Expected WebSocket upgrade request").into_response();
    };
    let ws = match state.config.max_message_size {
        Some(limit) => ws.max_message_size(limit),
        None => ws,
    };

    info!("New WebSocket connection attempt for document {} by user {}", document_id, user_id);
    ws.on_failed_upgrade(|e: axum::Error| error!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_socket(socket, document_id, user_id, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, document_id: String, user_id: String, state: AppState) {
    // Split the socket: the session owns the sender, the receive loop owns the receiver
    let (sender, receiver) = socket.split();
    let sink: FrameSink = Box::pin(
        sender
            .with(|frame: Frame| future::ready(Ok::<Message, axum::Error>(Message::from(frame))))
            .sink_map_err(RelayError::delivery),
    );

    let session = match state.lifecycle.accept(&document_id, &user_id, sink) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to accept session for document {}: {}", document_id, e);
            return;
        }
    };
    let _guard = state.lifecycle.guard(&session);

    let inbound = receiver.map(|item| item.map(Inbound::from).map_err(RelayError::receive));
    state.lifecycle.run(session, inbound, &state.hub).await;

    info!("WebSocket connection terminated for document {} by user {}", document_id, user_id);
}
