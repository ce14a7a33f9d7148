use futures_util::future::join_all;
use tracing::{debug, warn};

use super::lifecycle::{CloseReason, SessionLifecycle};
use super::session::{Frame, Session};

/// Fans a frame out from one session to the rest of its document.
#[derive(Clone)]
pub struct BroadcastHub {
    lifecycle: SessionLifecycle,
}

impl BroadcastHub {
    pub fn new(lifecycle: SessionLifecycle) -> Self {
        Self { lifecycle }
    }

    /// Deliver `frame` to every peer of `sender`.
    ///
    /// The peer set is a snapshot taken under the document's lock; the
    /// deliveries themselves run unlocked and independently of each other.
    /// A peer whose delivery fails is closed and deregistered. Nothing is
    /// reported back to the sender.
    pub async fn relay(&self, sender: &Session, frame: &Frame) {
        let peers = self
            .lifecycle
            .registry()
            .peers_except(sender.document_id(), sender.id());
        if peers.is_empty() {
            debug!(
                "No peers for session {} in document {}",
                sender.id(),
                sender.document_id()
            );
            return;
        }

        let results = join_all(peers.iter().map(|peer| peer.send(frame.clone()))).await;

        let mut failed = 0;
        for (peer, result) in peers.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                warn!(
                    "Delivery from session {} to session {} failed: {}",
                    sender.id(),
                    peer.id(),
                    e
                );
                self.lifecycle.close(peer, CloseReason::DeliveryFailed);
            }
        }

        debug!(
            "Relayed {} bytes from session {} in document {}: {} delivered, {} failed",
            frame.len(),
            sender.id(),
            sender.document_id(),
            peers.len() - failed,
            failed
        );
    }
}
