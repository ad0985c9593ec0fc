//! The message timeline of a conversation.
//!
//! A timeline is an ordered list of messages with at most one "open"
//! entry: the assistant message that the current turn's chunks are
//! still extending. Openness is tracked by an explicit cursor, not by
//! inspecting the tail, so seeded or transient messages can never be
//! mistaken for streaming targets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Identifies one message within its conversation.
///
/// Ids are allocated monotonically by the owning [`Timeline`] and are
/// never reused, so a removed message leaves no ambiguity behind.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
pub struct MessageId(pub(crate) u64);

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    /// The person driving the conversation.
    User,
    /// The remote assistant.
    Assistant,
}

/// The payload of a message.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum MessageBody {
    /// Free text. May be extended in place while its message is open.
    Text(String),
    /// A structured component payload. Replaced wholesale on every
    /// update, never merged field by field.
    Structured(Map<String, Value>),
}

impl MessageBody {
    /// Returns the text content, if this is a text body.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageBody::Text(text) => Some(text),
            MessageBody::Structured(_) => None,
        }
    }

    /// Returns the structured content, if this is a structured body.
    #[inline]
    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            MessageBody::Text(_) => None,
            MessageBody::Structured(body) => Some(body),
        }
    }
}

/// One timeline entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    /// Unique within the conversation, assigned at creation.
    pub id: MessageId,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// Who authored it.
    pub sender: MessageSender,
    /// Its payload.
    #[serde(flatten)]
    pub body: MessageBody,
    /// Whether the message is a follow-up prompt that is removed once
    /// the user acts on it.
    pub transient: bool,
}

/// An ordered message timeline with at most one open entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<Message>,
    /// Index of the open message, if any.
    open: Option<usize>,
    next_id: u64,
}

impl Timeline {
    /// Creates an empty timeline.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages in display order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.entries
    }

    /// Looks a message up by its id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.entries.iter().find(|msg| msg.id == id)
    }

    /// Appends a closed message and returns its id.
    ///
    /// Appending closes whichever message was open: an entry stops
    /// being extendable as soon as anything follows it.
    pub(crate) fn push(
        &mut self,
        sender: MessageSender,
        body: MessageBody,
        transient: bool,
    ) -> MessageId {
        self.open = None;
        let id = self.alloc_id();
        self.entries.push(Message {
            id,
            created_at: Utc::now(),
            sender,
            body,
            transient,
        });
        id
    }

    /// Appends an assistant message and marks it as the open one.
    pub(crate) fn push_open(&mut self, body: MessageBody) -> MessageId {
        let id = self.push(MessageSender::Assistant, body, false);
        self.open = Some(self.entries.len() - 1);
        id
    }

    /// Returns the id of the open message, if any.
    #[inline]
    pub(crate) fn open_id(&self) -> Option<MessageId> {
        self.open.map(|idx| self.entries[idx].id)
    }

    /// Returns a mutable borrow of the open message, if any.
    #[inline]
    pub(crate) fn open_mut(&mut self) -> Option<&mut Message> {
        self.open.map(|idx| &mut self.entries[idx])
    }

    /// Closes the open message, if any.
    #[inline]
    pub(crate) fn close_open(&mut self) {
        self.open = None;
    }

    /// Removes a message by id, returning whether it was present.
    pub(crate) fn remove(&mut self, id: MessageId) -> bool {
        let Some(idx) = self.entries.iter().position(|msg| msg.id == id)
        else {
            return false;
        };
        self.entries.remove(idx);
        if let Some(open) = self.open {
            if open == idx {
                self.open = None;
            } else if open > idx {
                self.open = Some(open - 1);
            }
        }
        true
    }

    fn alloc_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }
}
