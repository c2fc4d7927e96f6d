use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Attachment {
    pub url: String,
    pub file_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: u64,
    pub conversation_id: String,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub content: String,
    pub is_read: bool,
    pub origin: String,
    pub interest_id: Option<String>,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated message ready to be inserted. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub content: String,
    pub origin: &'static str,
    pub interest_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Per-conversation aggregate returned by the admin listing.
#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub conversation_id: String,
    pub last_message: Message,
    pub unread_count: u64,
    /// Every distinct sender / receiver seen in the conversation, sorted.
    pub participant_ids: Vec<String>,
}
