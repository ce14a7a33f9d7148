use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{info, warn};

use super::error::{RelayError, ValidationError};
use super::hub::BroadcastHub;
use super::registry::Registry;
use super::session::{FrameSink, Inbound, Session};

/// Why a session left the Active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    EndOfStream,
    ClientClosed,
    ReceiveError,
    DeliveryFailed,
    Requested,
    Shutdown,
    Dropped,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::EndOfStream => "end of stream",
            CloseReason::ClientClosed => "client closed",
            CloseReason::ReceiveError => "receive error",
            CloseReason::DeliveryFailed => "delivery failed",
            CloseReason::Requested => "close requested",
            CloseReason::Shutdown => "server shutdown",
            CloseReason::Dropped => "connection task dropped",
        }
    }
}

/// Owns the Connecting -> Active -> Closed transitions and keeps the
/// registry in step with them.
#[derive(Clone)]
pub struct SessionLifecycle {
    registry: Arc<Registry>,
}

impl SessionLifecycle {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Validate identifiers, create the session and register it.
    ///
    /// The returned session is Active and visible to relays in its document.
    pub fn accept(
        &self,
        document_id: &str,
        user_id: &str,
        sink: FrameSink,
    ) -> Result<Arc<Session>, ValidationError> {
        ValidationError::check(document_id, user_id)?;

        let session = Arc::new(Session::new(document_id.to_string(), user_id.to_string(), sink));
        // Nothing else can see the session yet, so activating before registering
        // means a relay never observes it in Connecting.
        session.activate();
        self.registry.register(session.clone());

        info!(
            "Session {} active: document={}, user={}",
            session.id(),
            document_id,
            user_id
        );
        Ok(session)
    }

    /// Move the session to Closed and deregister it.
    ///
    /// Concurrent or repeated calls collapse into one transition; only the
    /// call that performed it returns true.
    pub fn close(&self, session: &Session, reason: CloseReason) -> bool {
        if !session.mark_closed() {
            return false;
        }
        self.registry.deregister(session);
        info!(
            "Session {} closed ({}): document={}, user={}",
            session.id(),
            reason.as_str(),
            session.document_id(),
            session.user_id()
        );
        true
    }

    /// Close every registered session. Returns how many were closed by this call.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        self.registry
            .all_sessions()
            .iter()
            .filter(|session| self.close(session, reason))
            .count()
    }

    /// Guard that closes `session` when dropped, for connection tasks that
    /// may be cancelled before their receive loop finishes.
    pub fn guard(&self, session: &Arc<Session>) -> CloseGuard {
        CloseGuard {
            lifecycle: self.clone(),
            session: session.clone(),
        }
    }

    /// Receive loop for one session. Runs until the client goes away, the
    /// inbound stream fails, or someone else closes the session; then the
    /// session is closed and its outbound half released.
    pub async fn run<S>(&self, session: Arc<Session>, mut inbound: S, hub: &BroadcastHub)
    where
        S: Stream<Item = Result<Inbound, RelayError>> + Unpin,
    {
        let reason = loop {
            tokio::select! {
                biased;
                _ = session.closed() => break None,
                next = inbound.next() => match next {
                    Some(Ok(Inbound::Frame(frame))) => tokio::select! {
                        biased;
                        _ = session.closed() => break None,
                        _ = hub.relay(&session, &frame) => {}
                    },
                    Some(Ok(Inbound::Control)) => continue,
                    Some(Ok(Inbound::Close)) => break Some(CloseReason::ClientClosed),
                    Some(Err(e)) => {
                        warn!("Receive failed for session {}: {}", session.id(), e);
                        break Some(CloseReason::ReceiveError);
                    }
                    None => break Some(CloseReason::EndOfStream),
                },
            }
        };

        if let Some(reason) = reason {
            self.close(&session, reason);
        }
        session.release().await;
    }
}

pub struct CloseGuard {
    lifecycle: SessionLifecycle,
    session: Arc<Session>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.lifecycle.close(&self.session, CloseReason::Dropped);
    }
}
