//! The conversational session actor.

mod builder;
mod state;

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::Value;
use sidekick_actor::{Actor, CallError};
use sidekick_transport::{NodeError, SchemaSummary, TransportError};

use crate::timeline::Message;
pub use builder::SessionBuilder;
use state::{
    ChunkArrived, QuerySnapshot, SelectSuggestion, SessionState,
    StartConversation, StartDebugConversation, StartTurn,
};

/// How the assistant's reply chunks of a turn merge into the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnKind {
    /// Free-text reply: chunks accumulate into one open assistant
    /// message.
    Text,
    /// Component reply: every chunk is a complete structured payload
    /// that replaces the previous one. The closing payload may carry
    /// follow-up suggestions.
    Structured,
}

/// Opaque identity of the user driving the session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from its string form.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the string form of this id.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifies one conversation hosted by a session.
///
/// A fresh id is assigned every time a conversation starts. Inbound
/// chunks are tagged with the id their stream was opened under, and
/// tags that no longer match are silently dropped, which is what makes
/// restarting a conversation under an in-flight turn safe.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(String);

impl SessionId {
    /// Returns the string form of this id.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn for_conversation(user: &UserId, seq: u64) -> Self {
        Self(format!("{}:{seq}", user.as_str()))
    }

    /// Error-debugging conversations derive their id from the user
    /// identity and the error timestamp, so reporting the same error
    /// twice resumes under the same id.
    pub(crate) fn for_error(user: &UserId, timestamp: i64) -> Self {
        Self(format!("{}-{timestamp}", user.as_str()))
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The error type for session operations.
#[derive(Debug)]
pub enum SessionError {
    /// A turn is already in flight. The session handles one turn at a
    /// time and never queues.
    TurnInProgress,
    /// A structured-turn chunk did not parse as a JSON object. The
    /// timeline is untouched and the turn stays open.
    MalformedPayload(serde_json::Error),
    /// The transport failed the turn. Whatever chunks were merged
    /// before the failure stay in the timeline.
    Transport(Box<dyn TransportError>),
    /// The awaited turn was abandoned by a conversation restart.
    TurnAbandoned,
    /// No suggestion set is awaiting selection, or the action index is
    /// out of range.
    NoPendingSuggestion,
    /// The session actor is gone.
    SessionClosed,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::TurnInProgress => {
                "a turn is already in progress".fmt(f)
            }
            SessionError::MalformedPayload(err) => {
                write!(f, "malformed structured payload: {err}")
            }
            SessionError::Transport(err) => {
                write!(f, "transport failure: {err}")
            }
            SessionError::TurnAbandoned => {
                "the turn was abandoned by a conversation restart".fmt(f)
            }
            SessionError::NoPendingSuggestion => {
                "no follow-up suggestion is awaiting selection".fmt(f)
            }
            SessionError::SessionClosed => "the session is gone".fmt(f),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::MalformedPayload(err) => Some(err),
            SessionError::Transport(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A read-only view of the session, cloned out for rendering.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    /// Identifier of the current conversation.
    pub session_id: SessionId,
    /// Human label of the conversation, when one was established.
    pub title: Option<String>,
    /// Whether a turn is currently in flight.
    pub busy: bool,
    /// The messages, in display order.
    pub messages: Vec<Message>,
}

/// A conversational session: one message timeline, one conversation
/// identity and at most one turn in flight.
///
/// The session is hosted by an actor, so every operation goes through
/// its mailbox and chunks always fold in arrival order. Restarting the
/// conversation while a turn is in flight is safe: the old turn's
/// caller observes [`SessionError::TurnAbandoned`], and whatever its
/// stream still delivers is dropped by the stale-tag check.
///
/// Handles are cheap to clone and share the same actor.
#[derive(Clone)]
pub struct Session {
    handle: Actor<SessionState>,
}

impl Session {
    /// Starts a fresh conversation.
    ///
    /// The timeline resets (re-seeding the configured greeting), a new
    /// session id is assigned, pending suggestion prompts are dropped
    /// and an in-flight turn, if any, is abandoned.
    pub fn start_conversation(&self) -> Result<(), SessionError> {
        self.handle
            .send(StartConversation)
            .map_err(|_| SessionError::SessionClosed)
    }

    /// Starts an error-debugging conversation along with its opening
    /// turn, resolving when that turn closes.
    ///
    /// The session id derives from the user identity and the error
    /// timestamp, the error message becomes the conversation title and
    /// [`crate::UiSignal::Open`] is emitted. The opening turn is a
    /// structured turn carrying the stack-stripped error and the
    /// supplied workflow context; no user message is rendered for it.
    pub async fn start_debug_conversation(
        &self,
        error: NodeError,
        schemas: Vec<SchemaSummary>,
        nodes: Vec<String>,
        parameters: Value,
    ) -> Result<(), SessionError> {
        self.handle
            .call(|reply| StartDebugConversation {
                error,
                schemas,
                nodes,
                parameters,
                reply,
            })
            .await
            .map_err(turn_call_error)?
    }

    /// Starts one conversation turn from the user's message text,
    /// resolving when the turn closes.
    ///
    /// The user message is appended right away. While another turn is
    /// in flight this fails with [`SessionError::TurnInProgress`] and
    /// changes nothing.
    pub async fn start_turn<S: Into<String>>(
        &self,
        user_text: S,
        kind: TurnKind,
    ) -> Result<(), SessionError> {
        self.handle
            .call(|reply| StartTurn {
                user_text: user_text.into(),
                kind,
                reply,
            })
            .await
            .map_err(turn_call_error)?
    }

    /// Feeds one inbound chunk, tagged with the session id its stream
    /// was opened under.
    ///
    /// Stale tags and chunks arriving when no turn is open are dropped
    /// without an error. This is primarily a seam for transports that
    /// deliver out of band; turns driven by the session itself feed
    /// their chunks through the same path internally.
    pub async fn receive_chunk<S: Into<String>>(
        &self,
        session_id: &SessionId,
        chunk: S,
    ) -> Result<(), SessionError> {
        self.handle
            .call(|reply| ChunkArrived {
                session_id: session_id.clone(),
                turn: None,
                chunk: chunk.into(),
                reply: Some(reply),
            })
            .await
            .map_err(|_| SessionError::SessionClosed)?
    }

    /// Selects one of the follow-up actions currently offered.
    ///
    /// `index` addresses the `actions` list of the transient panel
    /// message. An apply action emits
    /// [`crate::UiSignal::ApplyCodeSnippet`] and resolves immediately;
    /// the ask-again action starts a new text turn from the action
    /// label and resolves when that turn closes.
    pub async fn select_suggestion(
        &self,
        index: usize,
    ) -> Result<(), SessionError> {
        self.handle
            .call(|reply| SelectSuggestion { index, reply })
            .await
            .map_err(turn_call_error)?
    }

    /// Returns a read-only snapshot of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.handle
            .call(|reply| QuerySnapshot { reply })
            .await
            .map_err(|_| SessionError::SessionClosed)
    }
}

impl Session {
    fn spawn_from_builder(builder: SessionBuilder) -> Self {
        let SessionBuilder {
            transport,
            user,
            greeting,
            on_signal,
        } = builder;

        let state = SessionState::new(transport, user, greeting, on_signal);
        Self {
            handle: Actor::spawn(state, Some("session")),
        }
    }
}

fn turn_call_error(err: CallError) -> SessionError {
    match err {
        CallError::Closed => SessionError::SessionClosed,
        // The handler dropped the reply without answering, which only
        // happens when a restart throws the pending turn away.
        CallError::DroppedReply => SessionError::TurnAbandoned,
    }
}
