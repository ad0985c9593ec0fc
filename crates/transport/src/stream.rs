use std::pin::Pin;
use std::task::{self, Poll};

use crate::TransportError;

/// The in-band value that terminates a turn's chunk stream.
///
/// The sentinel is control data. It is delivered to the consumer like
/// any other chunk, but it must never become message content.
pub const END_OF_TURN: &str = "__END__";

/// An open inbound chunk stream for one conversation turn.
pub trait TurnStream: Sized + Send + 'static {
    /// The error type that may be returned by this stream.
    type Error: TransportError;

    /// Attempts to pull out the next chunk of this stream.
    ///
    /// # Return value
    ///
    /// There are several possible values that can be returned:
    /// - `Poll::Pending` means the next chunk is not ready yet, and
    ///   the current task will be notified when it becomes available.
    /// - `Poll::Ready(Ok(Some(chunk)))` means the stream produced a
    ///   chunk. Chunks must be surfaced strictly in arrival order.
    ///   The empty string and [`END_OF_TURN`] are passed through
    ///   verbatim; interpreting them is the consumer's job, not the
    ///   adapter's.
    /// - `Poll::Ready(Ok(None))` means the stream is exhausted.
    /// - `Poll::Ready(Err(err))` means the stream failed, and no
    ///   further chunks will be produced.
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<String>, Self::Error>>;
}
