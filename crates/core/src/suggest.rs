//! The follow-up suggestion flow.
//!
//! When a structured turn closes and its final payload carries a
//! `suggestions` list, two transient prompt messages are appended to
//! the timeline: a text bubble asking the first candidate's follow-up
//! question, and a structured message whose `actions` list the UI
//! renders as quick-reply buttons. One action per candidate applies
//! that candidate's suggested code, and a trailing generic action asks
//! the assistant for another suggestion. The prompts live until the
//! user acts on them or the conversation moves on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::timeline::{MessageBody, MessageId, MessageSender, Timeline};

/// Label of the trailing action every suggestion set ends with.
pub const ASK_AGAIN_LABEL: &str = "No, try another suggestion";

/// One suggestion offered by the assistant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionCandidate {
    /// The question the prompt bubble asks.
    pub follow_up_question: String,
    /// Label of the action that applies this candidate.
    pub follow_up_action: String,
    /// Code the candidate wants applied to the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

/// What selecting an action does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Apply the candidate's suggested code to the editor. The prompts
    /// stay up so the user can still pick another action.
    #[serde(rename = "retry")]
    ApplyCode,
    /// Ask the assistant to propose something else. Starts a new turn
    /// from the action label and removes the prompts.
    #[serde(rename = "ask_again")]
    AskAgain,
}

/// One selectable follow-up action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionAction {
    /// Text the UI shows on the quick-reply button.
    pub label: String,
    /// What selecting it does.
    pub key: ActionKind,
}

/// A registered suggestion set, tied to the two transient prompt
/// messages it appended.
#[derive(Debug)]
pub(crate) struct SuggestionSet {
    pub(crate) candidates: Vec<SuggestionCandidate>,
    pub(crate) actions: Vec<SuggestionAction>,
    pub(crate) prompt_id: MessageId,
    pub(crate) panel_id: MessageId,
}

/// Parses the suggestion candidates out of a structured payload.
///
/// Returns `None` when the payload has no usable, non-empty candidate
/// list. Callers fail soft and leave the timeline as merged.
pub(crate) fn parse_candidates(
    body: &Map<String, Value>,
) -> Option<Vec<SuggestionCandidate>> {
    let raw = body.get("suggestions")?;
    let candidates: Vec<SuggestionCandidate> =
        serde_json::from_value(raw.clone()).ok()?;
    if candidates.is_empty() {
        return None;
    }
    Some(candidates)
}

/// Appends the transient prompt messages for `candidates` and returns
/// the registered set.
///
/// The panel message body has the shape `{"actions": [...]}`, with the
/// actions ordered like the candidates plus the trailing
/// [`ASK_AGAIN_LABEL`] entry.
pub(crate) fn present(
    timeline: &mut Timeline,
    candidates: Vec<SuggestionCandidate>,
) -> SuggestionSet {
    let mut actions: Vec<SuggestionAction> = candidates
        .iter()
        .map(|candidate| SuggestionAction {
            label: candidate.follow_up_action.clone(),
            key: ActionKind::ApplyCode,
        })
        .collect();
    actions.push(SuggestionAction {
        label: ASK_AGAIN_LABEL.to_owned(),
        key: ActionKind::AskAgain,
    });

    let prompt_id = timeline.push(
        MessageSender::Assistant,
        MessageBody::Text(candidates[0].follow_up_question.clone()),
        true,
    );

    let mut panel = Map::new();
    panel.insert(
        "actions".to_owned(),
        serde_json::to_value(&actions).unwrap_or(Value::Null),
    );
    let panel_id = timeline.push(
        MessageSender::Assistant,
        MessageBody::Structured(panel),
        true,
    );

    SuggestionSet {
        candidates,
        actions,
        prompt_id,
        panel_id,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("payload must be an object"),
        }
    }

    #[test]
    fn test_parse_candidates() {
        let body = payload(json!({
            "suggestions": [{
                "followUpQuestion": "Should I fix the expression?",
                "followUpAction": "Fix the expression",
                "codeSnippet": "return $json.item;",
            }],
        }));

        let candidates = parse_candidates(&body).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].follow_up_question,
            "Should I fix the expression?"
        );
        assert_eq!(
            candidates[0].code_snippet.as_deref(),
            Some("return $json.item;")
        );
    }

    #[test]
    fn test_parse_candidates_fails_soft() {
        // No list at all.
        assert!(parse_candidates(&payload(json!({"other": 1}))).is_none());
        // An empty list.
        assert!(
            parse_candidates(&payload(json!({"suggestions": []}))).is_none()
        );
        // A candidate missing its required fields.
        let body = payload(json!({
            "suggestions": [{ "followUpQuestion": "Only half there?" }],
        }));
        assert!(parse_candidates(&body).is_none());
    }

    #[test]
    fn test_present_appends_transient_prompts() {
        let mut timeline = Timeline::new();
        let candidates = vec![SuggestionCandidate {
            follow_up_question: "Should I fix the expression?".to_owned(),
            follow_up_action: "Fix the expression".to_owned(),
            code_snippet: None,
        }];

        let set = present(&mut timeline, candidates);

        let messages = timeline.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|msg| msg.transient));
        assert_eq!(
            messages[0].body.as_text(),
            Some("Should I fix the expression?")
        );

        let panel = messages[1].body.as_structured().unwrap();
        assert_eq!(
            panel.get("actions"),
            Some(&json!([
                { "label": "Fix the expression", "key": "retry" },
                { "label": ASK_AGAIN_LABEL, "key": "ask_again" },
            ]))
        );

        assert_eq!(set.actions.len(), 2);
        assert_eq!(set.prompt_id, messages[0].id);
        assert_eq!(set.panel_id, messages[1].id);
    }
}
