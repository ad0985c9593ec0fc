use serde::{Deserialize, Serialize};

use crate::TurnContext;

/// An outbound conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Identifier of the conversation this turn belongs to.
    pub session_id: String,
    /// The user's message text for this turn.
    pub user_text: String,
    /// Collaborator-supplied context, forwarded verbatim.
    #[serde(default)]
    pub context: TurnContext,
}
