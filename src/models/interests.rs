use crate::models::conversations::ConversationId;
use crate::models::participants::ParticipantId;
use serde::{Deserialize, Serialize};

/// Raised by the interest service once a submission has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestSubmitted {
    pub interest_id: String,
    pub submitter_id: ParticipantId,
    /// Title of the listing the interest was submitted for, when known.
    #[serde(default)]
    pub title: Option<String>,
}

impl InterestSubmitted {
    pub fn summary_text(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => format!(
                "New interest submitted for \"{}\" (interest {}).",
                title.trim(),
                self.interest_id
            ),
            _ => format!("New interest submitted (interest {}).", self.interest_id),
        }
    }
}

/// Payload of the global `new_interest` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestSummary {
    pub interest_id: String,
    pub submitter_id: ParticipantId,
    pub conversation_id: ConversationId,
    pub message_id: u64,
    pub title: Option<String>,
}
