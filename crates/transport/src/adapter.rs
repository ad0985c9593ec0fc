use crate::{TransportError, TurnRequest, TurnStream};

/// A type that carries conversation turns to an assistant backend and
/// hands back the chunk stream of each reply.
///
/// Adapters should behave like stateless objects, any two turns opened
/// through the same adapter must not affect each other.
pub trait TransportAdapter: Send + Sync {
    /// The error type that may be returned by this adapter.
    type Error: TransportError;

    /// The chunk stream type of this adapter.
    type Stream: TurnStream<Error = Self::Error>;

    /// Opens one turn: submits the request and resolves with the
    /// stream of reply chunks.
    ///
    /// The returned future must not borrow from the adapter so that
    /// callers can drive it independently of the adapter's lifetime.
    fn open_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static;
}
