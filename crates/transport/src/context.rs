use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Conversation context assembled by external collaborators.
///
/// Everything here is opaque to the session engine. It is captured
/// when a conversation starts and goes out with every turn of that
/// conversation, so the backend sees the same workflow state the
/// whole time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    /// The workflow error under debugging, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NodeError>,
    /// Execution-data schema summaries for the workflow's nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<SchemaSummary>,
    /// Names of the nodes in the workflow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    /// Parameters of the node under inspection.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
}

/// A failed workflow node's error, as reported by the editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeError {
    /// Human-readable error message.
    pub message: String,
    /// When the error occurred, in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Stack trace. Stripped before the error goes on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Any further fields the editor attached.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl NodeError {
    /// Creates an error with just a message and a timestamp.
    pub fn new<S: Into<String>>(message: S, timestamp: i64) -> Self {
        Self {
            message: message.into(),
            timestamp,
            stack: None,
            details: Map::new(),
        }
    }

    /// Returns a copy of this error with the stack trace removed.
    #[must_use]
    pub fn without_stack(mut self) -> Self {
        self.stack = None;
        self
    }
}

/// Execution-data schema of one workflow node.
///
/// Schemas are produced by a collaborator and never inspected here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaSummary {
    /// Name of the node the schema describes.
    pub node_name: String,
    /// The schema itself.
    pub schema: Value,
}
