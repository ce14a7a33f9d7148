//! Document membership and fan-out for relayed WebSocket frames.

pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{RelayError, ValidationError};
pub use hub::BroadcastHub;
pub use lifecycle::{CloseGuard, CloseReason, SessionLifecycle};
pub use registry::Registry;
pub use session::{Frame, FrameSink, Inbound, Session, SessionState};
