use crate::common::error::{AppError, ServiceResult};
use crate::entities::messages::ConversationRow;
use crate::models::messages::{Message, MessageResponse};
use crate::models::participants::{ParticipantId, ParticipantProfile};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const PREFIX: &str = "conversation_";
const SEPARATOR: char = '_';

/// Key shared by every message exchanged between the same two participants.
///
/// Derived as `conversation_<lower>_<higher>` where the participant ids are
/// ordered lexicographically, so the same pair always yields the same id
/// no matter which side asks. Storage grouping and realtime subscriptions
/// are both keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn resolve(a: &ParticipantId, b: &ParticipantId) -> ServiceResult<Self> {
        if a.is_blank() || b.is_blank() {
            return Err(AppError::ConversationsInvalidParticipants);
        }
        let (lower, higher) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self(format!("{PREFIX}{lower}{SEPARATOR}{higher}")))
    }

    /// Same as [`ConversationId::resolve`] for callers holding optional ids.
    pub fn resolve_optional(
        a: Option<&ParticipantId>,
        b: Option<&ParticipantId>,
    ) -> ServiceResult<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Self::resolve(a, b),
            _ => Err(AppError::ConversationsInvalidParticipants),
        }
    }

    /// Wraps an id received from a client or read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConversationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage-side grouping of a conversation, before participant profiles are attached.
#[derive(Debug, Clone)]
pub struct ConversationAggregate {
    pub conversation_id: ConversationId,
    pub last_message: Message,
    pub unread_count: u64,
    pub participant_ids: Vec<ParticipantId>,
}

impl TryFrom<ConversationRow> for ConversationAggregate {
    type Error = AppError;

    fn try_from(value: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            conversation_id: ConversationId::from_raw(value.conversation_id),
            last_message: Message::try_from(value.last_message)?,
            unread_count: value.unread_count,
            participant_ids: value
                .participant_ids
                .into_iter()
                .map(ParticipantId::from)
                .collect(),
        })
    }
}

/// One entry of a participant's conversation list.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub participant: Option<ParticipantProfile>,
    pub last_message: Option<MessageResponse>,
    pub unread_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessages {
    pub conversation_id: ConversationId,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadCount {
    pub conversation_id: ConversationId,
    pub unread_count: u64,
}
