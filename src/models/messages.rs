use crate::common::error::{AppError, ServiceResult};
use crate::entities::messages::{Message as MessageEntity, NewMessage};
use crate::models::conversations::ConversationId;
use crate::models::participants::{ParticipantId, ParticipantProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::entities::messages::Attachment;

pub const MAX_CONTENT_LENGTH: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    UserMessage,
    AdminReply,
    SystemMessage,
}

impl MessageOrigin {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageOrigin::UserMessage => "user_message",
            MessageOrigin::AdminReply => "admin_reply",
            MessageOrigin::SystemMessage => "system_message",
        }
    }

    pub const fn is_system(&self) -> bool {
        matches!(self, MessageOrigin::SystemMessage)
    }
}

impl TryFrom<&str> for MessageOrigin {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user_message" => Ok(MessageOrigin::UserMessage),
            "admin_reply" => Ok(MessageOrigin::AdminReply),
            "system_message" => Ok(MessageOrigin::SystemMessage),
            _ => Err(AppError::Unexpected),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub message_id: u64,
    pub conversation_id: ConversationId,
    pub sender_id: Option<ParticipantId>,
    pub receiver_id: Option<ParticipantId>,
    pub content: String,
    pub read: bool,
    pub origin: MessageOrigin,
    pub interest_id: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MessageEntity> for Message {
    type Error = AppError;

    fn try_from(value: MessageEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            message_id: value.id,
            conversation_id: ConversationId::from_raw(value.conversation_id),
            sender_id: value.sender_id.map(ParticipantId::from),
            receiver_id: value.receiver_id.map(ParticipantId::from),
            content: value.content,
            read: value.is_read,
            origin: MessageOrigin::try_from(value.origin.as_str())?,
            interest_id: value.interest_id,
            attachments: value.attachments.0,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Input to the message store before validation.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub sender_id: Option<ParticipantId>,
    pub receiver_id: Option<ParticipantId>,
    pub content: String,
    pub origin: MessageOrigin,
    /// Left empty to have it derived from the sender and receiver.
    pub conversation_id: Option<ConversationId>,
    pub interest_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// A draft that passed validation, with trimmed content and a settled conversation id.
#[derive(Debug, Clone)]
pub struct ValidatedMessage {
    pub conversation_id: ConversationId,
    pub sender_id: Option<ParticipantId>,
    pub receiver_id: Option<ParticipantId>,
    pub content: String,
    pub origin: MessageOrigin,
    pub interest_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl MessageDraft {
    pub fn validate(self) -> ServiceResult<ValidatedMessage> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::MessagesInvalid("Message content is required."));
        }
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(AppError::MessagesInvalid(
                "Message content must be at most 5000 characters.",
            ));
        }
        if self
            .attachments
            .iter()
            .any(|attachment| attachment.url.trim().is_empty())
        {
            return Err(AppError::MessagesInvalid("Attachments require a url."));
        }

        let has_participants = self.sender_id.is_some() && self.receiver_id.is_some();
        if !self.origin.is_system() && !has_participants {
            return Err(AppError::MessagesInvalid(
                "A message requires both a sender and a receiver.",
            ));
        }

        let conversation_id = match (self.conversation_id, has_participants) {
            (None, true) => ConversationId::resolve_optional(
                self.sender_id.as_ref(),
                self.receiver_id.as_ref(),
            )?,
            (Some(conversation_id), true) => {
                let expected = ConversationId::resolve_optional(
                    self.sender_id.as_ref(),
                    self.receiver_id.as_ref(),
                )?;
                if conversation_id != expected {
                    return Err(AppError::MessagesInvalid(
                        "The conversation does not belong to the message participants.",
                    ));
                }
                conversation_id
            }
            (Some(conversation_id), false) => conversation_id,
            (None, false) => {
                return Err(AppError::MessagesInvalid(
                    "A system message without participants requires a conversation id.",
                ));
            }
        };

        Ok(ValidatedMessage {
            conversation_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: content.to_owned(),
            origin: self.origin,
            interest_id: self.interest_id,
            attachments: self.attachments,
        })
    }
}

impl From<ValidatedMessage> for NewMessage {
    fn from(value: ValidatedMessage) -> Self {
        Self {
            conversation_id: value.conversation_id.to_string(),
            sender_id: value.sender_id.map(ParticipantId::into_inner),
            receiver_id: value.receiver_id.map(ParticipantId::into_inner),
            content: value.content,
            origin: value.origin.as_str(),
            interest_id: value.interest_id,
            attachments: value.attachments,
        }
    }
}

/// Wire form of a stored message, used by the HTTP api and realtime pushes alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: u64,
    pub conversation_id: ConversationId,
    pub sender_id: Option<ParticipantId>,
    pub receiver_id: Option<ParticipantId>,
    pub sender: Option<ParticipantProfile>,
    pub receiver: Option<ParticipantProfile>,
    pub content: String,
    pub read: bool,
    pub origin: MessageOrigin,
    pub interest_id: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageResponse {
    pub fn new(
        message: Message,
        sender: Option<ParticipantProfile>,
        receiver: Option<ParticipantProfile>,
    ) -> Self {
        Self {
            id: message.message_id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            sender,
            receiver,
            content: message.content,
            read: message.read,
            origin: message.origin,
            interest_id: message.interest_id,
            attachments: message.attachments,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}
