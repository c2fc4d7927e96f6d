//! In-process backends for the message store and participant directory.
//!
//! Used by the test-suite and for running the api without MySQL. Data lives
//! only as long as the value does.

use crate::entities::messages::{ConversationRow, Message, NewMessage};
use crate::entities::participants::{Account, Session};
use crate::models::participants::Role;
use crate::repositories::messages::MessageStore;
use crate::repositories::participants::ParticipantDirectory;
use async_trait::async_trait;
use chrono::Utc;
use hashbrown::HashMap;
use sqlx::types::Json;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(messages: &[Message], message: NewMessage) -> Message {
        let now = Utc::now();
        // messages are never removed, so the length is a unique id source
        Message {
            id: messages.len() as u64 + 1,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            is_read: false,
            origin: message.origin.to_owned(),
            interest_id: message.interest_id,
            attachments: Json(message.attachments),
            created_at: now,
            updated_at: now,
        }
    }
}

fn is_unread_for(message: &Message, conversation_id: &str, receiver_id: &str) -> bool {
    message.conversation_id == conversation_id
        && message.receiver_id.as_deref() == Some(receiver_id)
        && !message.is_read
}

fn newest_first(a: &Message, b: &Message) -> std::cmp::Ordering {
    (b.created_at, b.id).cmp(&(a.created_at, a.id))
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message> {
        let mut messages = self.messages.write().await;
        let message = Self::build(&messages, message);
        messages.push(message.clone());
        Ok(message)
    }

    async fn insert_if_conversation_empty(
        &self,
        message: NewMessage,
    ) -> anyhow::Result<Option<Message>> {
        let mut messages = self.messages.write().await;
        if messages
            .iter()
            .any(|stored| stored.conversation_id == message.conversation_id)
        {
            return Ok(None);
        }
        let message = Self::build(&messages, message);
        messages.push(message.clone());
        Ok(Some(message))
    }

    async fn fetch_by_conversation(&self, conversation_id: &str) -> anyhow::Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut conversation: Vec<Message> = messages
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .cloned()
            .collect();
        conversation.sort_by_key(|message| (message.created_at, message.id));
        Ok(conversation)
    }

    async fn fetch_latest(&self, conversation_id: &str) -> anyhow::Result<Option<Message>> {
        let messages = self.messages.read().await;
        let latest = messages
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .min_by(|a, b| newest_first(a, b))
            .cloned();
        Ok(latest)
    }

    async fn is_party(&self, conversation_id: &str, participant_id: &str) -> anyhow::Result<bool> {
        let messages = self.messages.read().await;
        Ok(messages.iter().any(|message| {
            message.conversation_id == conversation_id
                && (message.sender_id.as_deref() == Some(participant_id)
                    || message.receiver_id.as_deref() == Some(participant_id))
        }))
    }

    async fn mark_read(&self, conversation_id: &str, receiver_id: &str) -> anyhow::Result<u64> {
        let mut messages = self.messages.write().await;
        let now = Utc::now();
        let mut updated = 0;
        for message in messages
            .iter_mut()
            .filter(|message| is_unread_for(message, conversation_id, receiver_id))
        {
            message.is_read = true;
            message.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_unread(
        &self,
        conversation_id: &str,
        receiver_id: &str,
    ) -> anyhow::Result<u64> {
        let messages = self.messages.read().await;
        let count = messages
            .iter()
            .filter(|message| is_unread_for(message, conversation_id, receiver_id))
            .count();
        Ok(count as u64)
    }

    async fn list_conversations(&self, receiver_id: &str) -> anyhow::Result<Vec<ConversationRow>> {
        let messages = self.messages.read().await;
        let mut rows: HashMap<&str, ConversationRow> = HashMap::new();
        let mut participants: HashMap<&str, BTreeSet<String>> = HashMap::new();
        for message in messages.iter() {
            let conversation_id = message.conversation_id.as_str();
            let unread = message.receiver_id.as_deref() == Some(receiver_id) && !message.is_read;
            let row = rows
                .entry(conversation_id)
                .or_insert_with(|| ConversationRow {
                    conversation_id: conversation_id.to_owned(),
                    last_message: message.clone(),
                    unread_count: 0,
                    participant_ids: vec![],
                });
            if newest_first(message, &row.last_message).is_lt() {
                row.last_message = message.clone();
            }
            if unread {
                row.unread_count += 1;
            }

            let ids = participants.entry(conversation_id).or_default();
            ids.extend(message.sender_id.iter().cloned());
            ids.extend(message.receiver_id.iter().cloned());
        }

        let mut rows: Vec<ConversationRow> = rows
            .into_iter()
            .map(|(conversation_id, mut row)| {
                row.participant_ids = participants
                    .remove(conversation_id)
                    .map(|ids| ids.into_iter().collect())
                    .unwrap_or_default();
                row
            })
            .collect();
        rows.sort_by(|a, b| newest_first(&a.last_message, &b.last_message));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryParticipantDirectory {
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemoryParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, id: &str, name: &str, email: &str, role: &str) {
        let account = Account {
            id: id.to_owned(),
            name: name.to_owned(),
            email: email.to_owned(),
            role: role.to_owned(),
        };
        self.accounts.write().await.insert(id.to_owned(), account);
    }

    /// Registers a bearer token for an existing account.
    pub async fn insert_session(&self, token: &str, user_id: &str, role: &str) {
        let session = Session {
            user_id: user_id.to_owned(),
            role: role.to_owned(),
            expires_at: None,
        };
        self.sessions.write().await.insert(token.to_owned(), session);
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn fetch_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    async fn fetch_admin(&self) -> anyhow::Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        let admin = accounts
            .values()
            .filter(|account| account.role == Role::Admin.as_str())
            .min_by(|a, b| a.id.cmp(&b.id))
            .cloned();
        Ok(admin)
    }

    async fn fetch_one(&self, participant_id: &str) -> anyhow::Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(participant_id).cloned())
    }
}
