//! Chunk merging rules for streamed assistant replies.
//!
//! Each inbound chunk folds into the timeline according to the kind of
//! the turn it belongs to. Text turns accumulate chunks into a single
//! open assistant message. Structured turns treat every chunk as a
//! complete payload that replaces the previous one. Two chunk values
//! are reserved for control: the empty string is ignored and
//! [`END_OF_TURN`] closes the turn without ever becoming content.

use std::borrow::Cow;

use serde_json::{Map, Value};
use sidekick_transport::END_OF_TURN;

use crate::timeline::{MessageBody, MessageId, Timeline};

/// What applying one chunk did to the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    /// Nothing merged, the timeline is untouched.
    Ignored,
    /// A new open assistant message was appended.
    Appended(MessageId),
    /// The open message was extended or replaced in place.
    Updated(MessageId),
    /// The terminal sentinel closed the turn. Carries the message that
    /// was open, if there was one.
    TurnClosed(Option<MessageId>),
}

/// Folds one chunk of a text turn into the timeline.
///
/// Content chunks only extend an open text body. A chunk that has no
/// text body to extend is ignored and the timeline is left untouched.
pub(crate) fn apply_text(
    timeline: &mut Timeline,
    chunk: &str,
) -> MergeOutcome {
    if chunk.is_empty() {
        return MergeOutcome::Ignored;
    }
    if chunk == END_OF_TURN {
        let open = timeline.open_id();
        timeline.close_open();
        return MergeOutcome::TurnClosed(open);
    }

    let text = normalize_newlines(chunk);
    match timeline.open_mut() {
        Some(msg) => {
            let MessageBody::Text(body) = &mut msg.body else {
                return MergeOutcome::Ignored;
            };
            body.push_str(&text);
            MergeOutcome::Updated(msg.id)
        }
        None => {
            let id = timeline.push_open(MessageBody::Text(text.into_owned()));
            MergeOutcome::Appended(id)
        }
    }
}

/// Folds one chunk of a structured turn into the timeline.
///
/// Non-terminal chunks must parse as a JSON object. A chunk that does
/// not parse leaves the timeline untouched and the turn open.
pub(crate) fn apply_structured(
    timeline: &mut Timeline,
    chunk: &str,
) -> Result<MergeOutcome, serde_json::Error> {
    if chunk.is_empty() {
        return Ok(MergeOutcome::Ignored);
    }
    if chunk == END_OF_TURN {
        let open = timeline.open_id();
        timeline.close_open();
        return Ok(MergeOutcome::TurnClosed(open));
    }

    let payload: Map<String, Value> = serde_json::from_str(chunk)?;
    match timeline.open_mut() {
        Some(msg) => {
            // The latest payload wins, fields are never merged.
            msg.body = MessageBody::Structured(payload);
            Ok(MergeOutcome::Updated(msg.id))
        }
        None => {
            let id = timeline.push_open(MessageBody::Structured(payload));
            Ok(MergeOutcome::Appended(id))
        }
    }
}

/// Replaces literal backslash-n sequences with real line breaks.
fn normalize_newlines(chunk: &str) -> Cow<'_, str> {
    if chunk.contains("\\n") {
        Cow::Owned(chunk.replace("\\n", "\n"))
    } else {
        Cow::Borrowed(chunk)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::timeline::{MessageSender, Timeline};

    #[test]
    fn test_text_chunks_accumulate() {
        let mut timeline = Timeline::new();
        for chunk in ["It ", "looks ", "like ", "a ", "type ", "error."] {
            apply_text(&mut timeline, chunk);
        }

        assert_eq!(timeline.messages().len(), 1);
        assert_eq!(
            timeline.messages()[0].body.as_text(),
            Some("It looks like a type error.")
        );

        let open_id = timeline.open_id();
        assert!(open_id.is_some());
        let outcome = apply_text(&mut timeline, END_OF_TURN);
        assert_eq!(outcome, MergeOutcome::TurnClosed(open_id));
        assert_eq!(timeline.open_id(), None);
        // The sentinel never becomes content.
        assert_eq!(
            timeline.messages()[0].body.as_text(),
            Some("It looks like a type error.")
        );
    }

    #[test]
    fn test_newline_normalization() {
        let mut timeline = Timeline::new();
        apply_text(&mut timeline, "line one\\n");
        apply_text(&mut timeline, "line two\\nline three");

        assert_eq!(
            timeline.messages()[0].body.as_text(),
            Some("line one\nline two\nline three")
        );
    }

    #[test]
    fn test_empty_chunk_is_a_no_op() {
        let mut timeline = Timeline::new();
        apply_text(&mut timeline, "Hello");
        let before = timeline.clone();

        assert_eq!(apply_text(&mut timeline, ""), MergeOutcome::Ignored);
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_text_chunk_into_a_structured_body_is_ignored() {
        let mut timeline = Timeline::new();
        apply_structured(&mut timeline, r#"{"step": 1}"#).unwrap();
        let before = timeline.clone();

        // There is no text body to extend, so nothing merges.
        let outcome = apply_text(&mut timeline, "stray text");
        assert_eq!(outcome, MergeOutcome::Ignored);
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_sentinel_on_empty_timeline() {
        let mut timeline = Timeline::new();
        let outcome = apply_text(&mut timeline, END_OF_TURN);
        assert_eq!(outcome, MergeOutcome::TurnClosed(None));
        assert!(timeline.messages().is_empty());
    }

    #[test]
    fn test_user_message_closes_the_open_one() {
        let mut timeline = Timeline::new();
        apply_text(&mut timeline, "First reply");
        timeline.push(
            MessageSender::User,
            MessageBody::Text("next question".to_owned()),
            false,
        );
        apply_text(&mut timeline, "Second reply");

        let messages = timeline.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].body.as_text(), Some("First reply"));
        assert_eq!(messages[2].body.as_text(), Some("Second reply"));
    }

    #[test]
    fn test_structured_payload_replaced_wholesale() {
        let mut timeline = Timeline::new();
        apply_structured(&mut timeline, r#"{"step": 1, "draft": true}"#)
            .unwrap();
        apply_structured(&mut timeline, r#"{"step": 2}"#).unwrap();

        let messages = timeline.messages();
        assert_eq!(messages.len(), 1);
        let body = messages[0].body.as_structured().unwrap();
        assert_eq!(body.get("step"), Some(&json!(2)));
        // Fields from earlier payloads do not survive.
        assert_eq!(body.get("draft"), None);
    }

    #[test]
    fn test_malformed_payload_leaves_turn_open() {
        let mut timeline = Timeline::new();
        apply_structured(&mut timeline, r#"{"step": 1}"#).unwrap();
        let before = timeline.clone();

        assert!(apply_structured(&mut timeline, "not json").is_err());
        // A non-object is just as malformed as unparsable text.
        assert!(apply_structured(&mut timeline, r#""quoted""#).is_err());
        assert_eq!(timeline, before);

        // The turn is still open: the next valid payload lands in the
        // same message.
        apply_structured(&mut timeline, r#"{"step": 2}"#).unwrap();
        assert_eq!(timeline.messages().len(), 1);
    }
}
