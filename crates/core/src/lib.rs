//! Core logic of the session engine: the message timeline, chunk
//! merging, the session actor and the follow-up suggestion flow.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod merge;
mod session;
mod signal;
pub mod suggest;
pub mod timeline;
mod transport_client;

pub use session::{
    Session, SessionBuilder, SessionError, SessionId, SessionSnapshot,
    TurnKind, UserId,
};
pub use signal::UiSignal;
