use std::error::Error;

/// A type of error that a transport can fail with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connection to the assistant backend was lost.
    Disconnected,
    /// The transport gave up waiting for the backend.
    ///
    /// Deadlines are the adapter's concern; the session engine keeps
    /// no timer of its own.
    Timeout,
    /// Any other errors.
    Other,
}

/// The error type for a transport adapter.
pub trait TransportError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}
