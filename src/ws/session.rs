use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{Sink, SinkExt};
use tokio::sync::{watch, Mutex};
use tracing::debug;
use uuid::Uuid;

use super::error::RelayError;

/// Upper bound on flushing a closed session's sink.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// An opaque payload as it travels through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the receive loop can observe on a session's inbound half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    /// Ping/pong and similar, handled by the transport.
    Control,
    Close,
}

/// Outbound half of a client connection.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = RelayError> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// One client's attachment to a document.
///
/// The outbound sink is only reachable through [`Session::send`], which
/// serializes writers and refuses to write once the session is closed.
pub struct Session {
    id: Uuid,
    document_id: String,
    user_id: String,
    connected_at: DateTime<Utc>,
    state: watch::Sender<SessionState>,
    sink: Mutex<FrameSink>,
}

impl Session {
    pub(crate) fn new(document_id: String, user_id: String, sink: FrameSink) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            id: Uuid::new_v4(),
            document_id,
            user_id,
            connected_at: Utc::now(),
            state,
            sink: Mutex::new(sink),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Connecting -> Active. Returns false if the session already left Connecting.
    pub(crate) fn activate(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Connecting {
                *state = SessionState::Active;
                true
            } else {
                false
            }
        })
    }

    /// Move to Closed. Only the first caller gets `true`.
    pub(crate) fn mark_closed(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        })
    }

    /// Resolves once the session is Closed (immediately if it already is).
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this can only fail if it was dropped.
        let _ = rx.wait_for(|state| *state == SessionState::Closed).await;
    }

    /// Write one frame to this session's client.
    ///
    /// Waiting for the sink, and the write itself, are abandoned as soon as
    /// the session is closed; a stalled client never outlives its session.
    pub async fn send(&self, frame: Frame) -> Result<(), RelayError> {
        let write = async {
            let mut sink = self.sink.lock().await;
            if !self.is_active() {
                return Err(RelayError::SessionClosed);
            }
            sink.send(frame).await
        };

        tokio::select! {
            biased;
            _ = self.closed() => Err(RelayError::SessionClosed),
            result = write => result,
        }
    }

    /// Flush and close the outbound half. Called once the receive loop has exited.
    pub(crate) async fn release(&self) {
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(RELEASE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Closing sink for session {} failed: {}", self.id, e),
            Err(_) => debug!("Closing sink for session {} timed out, dropping it", self.id),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("document_id", &self.document_id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .finish()
    }
}
