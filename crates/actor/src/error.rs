use std::error::Error;
use std::fmt;

/// A type of error which can be returned whenever messages are sent to
/// an actor whose mailbox has been closed.
pub struct MailboxClosed;

impl fmt::Debug for MailboxClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxClosed").finish()
    }
}

impl fmt::Display for MailboxClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "the actor mailbox has been closed".fmt(f)
    }
}

impl Error for MailboxClosed {}

/// The error type for [`crate::Actor::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    /// The actor mailbox has been closed; the message was never
    /// delivered.
    Closed,
    /// The message was delivered, but its handler dropped the reply
    /// channel without answering.
    DroppedReply,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Closed => "the actor mailbox has been closed".fmt(f),
            CallError::DroppedReply => {
                "the handler dropped the reply channel".fmt(f)
            }
        }
    }
}

impl Error for CallError {}
