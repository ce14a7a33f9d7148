use futures_util::{future, sink};
use tokio::sync::mpsc;

use super::error::RelayError;
use super::session::{Frame, FrameSink};

/// A sink that forwards every frame into an in-memory channel.
/// Dropping the receiver makes further sends fail.
pub(crate) fn memory_sink() -> (FrameSink, mpsc::UnboundedReceiver<Frame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = sink::unfold(tx, |tx, frame: Frame| async move {
        tx.send(frame).map_err(RelayError::delivery)?;
        Ok::<_, RelayError>(tx)
    });
    (Box::pin(sink), rx)
}

/// A sink whose client has already gone away.
pub(crate) fn failing_sink() -> FrameSink {
    let (sink, rx) = memory_sink();
    drop(rx);
    sink
}

/// A sink whose client stopped reading: every write stays pending.
pub(crate) fn stalled_sink() -> FrameSink {
    Box::pin(sink::unfold((), |(), _frame: Frame| {
        future::pending::<Result<(), RelayError>>()
    }))
}
