use crate::models::conversations::ConversationId;
use crate::models::interests::InterestSummary;
use crate::models::messages::MessageResponse;
use serde::{Deserialize, Serialize};

/// Frames pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(MessageResponse),
    NewInterest(InterestSummary),
    Error(EventError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventError {
    pub code: String,
    pub message: String,
}

/// Frames sent by connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation(ConversationId),
    LeaveConversation(ConversationId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeTarget {
    Conversation(ConversationId),
    Global,
}

/// What travels over the cross-instance relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub target: RealtimeTarget,
    pub event: ServerEvent,
}
