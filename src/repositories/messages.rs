use crate::entities::messages::{ConversationRow, Message, NewMessage};
use async_trait::async_trait;
use hashbrown::HashMap;
use sqlx::types::Json;
use sqlx::{MySql, Pool};
use std::collections::BTreeSet;

/// Durable message storage. The only mutable shared resource of the messaging core;
/// every method is a single independent write or read.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message>;

    /// Inserts `message` only when its conversation holds no message yet.
    async fn insert_if_conversation_empty(
        &self,
        message: NewMessage,
    ) -> anyhow::Result<Option<Message>>;

    /// All messages of a conversation, oldest first (ties broken by id).
    async fn fetch_by_conversation(&self, conversation_id: &str) -> anyhow::Result<Vec<Message>>;

    async fn fetch_latest(&self, conversation_id: &str) -> anyhow::Result<Option<Message>>;

    /// Whether `participant_id` sent or received any message of the conversation.
    async fn is_party(&self, conversation_id: &str, participant_id: &str) -> anyhow::Result<bool>;

    async fn mark_read(&self, conversation_id: &str, receiver_id: &str) -> anyhow::Result<u64>;

    async fn count_unread(&self, conversation_id: &str, receiver_id: &str)
    -> anyhow::Result<u64>;

    /// Every conversation with its latest message, sorted newest conversation first.
    /// Unread counts only include messages addressed to `receiver_id`.
    async fn list_conversations(&self, receiver_id: &str) -> anyhow::Result<Vec<ConversationRow>>;
}

pub struct MySqlMessageStore {
    db: Pool<MySql>,
}

impl MySqlMessageStore {
    pub fn new(db: Pool<MySql>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, message_id: u64) -> sqlx::Result<Message> {
        const QUERY: &str = const_str::concat!(
            "SELECT ",
            READ_FIELDS,
            " FROM ",
            TABLE_NAME,
            " WHERE id = ?"
        );
        sqlx::query_as(QUERY)
            .bind(message_id)
            .fetch_one(&self.db)
            .await
    }
}

const TABLE_NAME: &str = "messages";
const READ_FIELDS: &str = r#"
id, conversation_id, sender_id, receiver_id, content, is_read,
origin, interest_id, attachments, created_at, updated_at"#;

#[async_trait]
impl MessageStore for MySqlMessageStore {
    async fn insert(&self, message: NewMessage) -> anyhow::Result<Message> {
        const QUERY: &str = const_str::concat!(
            "INSERT INTO ",
            TABLE_NAME,
            " (conversation_id, sender_id, receiver_id, content, is_read, origin, interest_id, attachments) ",
            "VALUES (?, ?, ?, ?, FALSE, ?, ?, ?)"
        );
        let result = sqlx::query(QUERY)
            .bind(&message.conversation_id)
            .bind(&message.sender_id)
            .bind(&message.receiver_id)
            .bind(&message.content)
            .bind(message.origin)
            .bind(&message.interest_id)
            .bind(Json(&message.attachments))
            .execute(&self.db)
            .await?;
        Ok(self.fetch_one(result.last_insert_id()).await?)
    }

    async fn insert_if_conversation_empty(
        &self,
        message: NewMessage,
    ) -> anyhow::Result<Option<Message>> {
        const QUERY: &str = const_str::concat!(
            "INSERT INTO ",
            TABLE_NAME,
            " (conversation_id, sender_id, receiver_id, content, is_read, origin, interest_id, attachments) ",
            "SELECT ?, ?, ?, ?, FALSE, ?, ?, ? FROM DUAL ",
            "WHERE NOT EXISTS (SELECT 1 FROM ",
            TABLE_NAME,
            " WHERE conversation_id = ?)"
        );
        let result = sqlx::query(QUERY)
            .bind(&message.conversation_id)
            .bind(&message.sender_id)
            .bind(&message.receiver_id)
            .bind(&message.content)
            .bind(message.origin)
            .bind(&message.interest_id)
            .bind(Json(&message.attachments))
            .bind(&message.conversation_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(self.fetch_one(result.last_insert_id()).await?))
    }

    async fn fetch_by_conversation(&self, conversation_id: &str) -> anyhow::Result<Vec<Message>> {
        const QUERY: &str = const_str::concat!(
            "SELECT ",
            READ_FIELDS,
            " FROM ",
            TABLE_NAME,
            " WHERE conversation_id = ? ORDER BY created_at ASC, id ASC"
        );
        let messages = sqlx::query_as(QUERY)
            .bind(conversation_id)
            .fetch_all(&self.db)
            .await?;
        Ok(messages)
    }

    async fn fetch_latest(&self, conversation_id: &str) -> anyhow::Result<Option<Message>> {
        const QUERY: &str = const_str::concat!(
            "SELECT ",
            READ_FIELDS,
            " FROM ",
            TABLE_NAME,
            " WHERE conversation_id = ? ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let message = sqlx::query_as(QUERY)
            .bind(conversation_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(message)
    }

    async fn is_party(&self, conversation_id: &str, participant_id: &str) -> anyhow::Result<bool> {
        const QUERY: &str = const_str::concat!(
            "SELECT EXISTS(SELECT 1 FROM ",
            TABLE_NAME,
            " WHERE conversation_id = ? AND (sender_id = ? OR receiver_id = ?))"
        );
        let is_party: i64 = sqlx::query_scalar(QUERY)
            .bind(conversation_id)
            .bind(participant_id)
            .bind(participant_id)
            .fetch_one(&self.db)
            .await?;
        Ok(is_party != 0)
    }

    async fn mark_read(&self, conversation_id: &str, receiver_id: &str) -> anyhow::Result<u64> {
        const QUERY: &str = const_str::concat!(
            "UPDATE ",
            TABLE_NAME,
            " SET is_read = TRUE ",
            "WHERE conversation_id = ? AND receiver_id = ? AND is_read IS FALSE"
        );
        let result = sqlx::query(QUERY)
            .bind(conversation_id)
            .bind(receiver_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_unread(
        &self,
        conversation_id: &str,
        receiver_id: &str,
    ) -> anyhow::Result<u64> {
        const QUERY: &str = const_str::concat!(
            "SELECT COUNT(*) FROM ",
            TABLE_NAME,
            " WHERE conversation_id = ? AND receiver_id = ? AND is_read IS FALSE"
        );
        let count: i64 = sqlx::query_scalar(QUERY)
            .bind(conversation_id)
            .bind(receiver_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }

    async fn list_conversations(&self, receiver_id: &str) -> anyhow::Result<Vec<ConversationRow>> {
        const LATEST_QUERY: &str = const_str::concat!(
            "SELECT ",
            READ_FIELDS,
            " FROM (SELECT ",
            READ_FIELDS,
            ", ROW_NUMBER() OVER (PARTITION BY conversation_id ORDER BY created_at DESC, id DESC) AS position",
            " FROM ",
            TABLE_NAME,
            ") ranked WHERE position = 1 ORDER BY created_at DESC, id DESC"
        );
        const UNREAD_QUERY: &str = const_str::concat!(
            "SELECT conversation_id, COUNT(*) FROM ",
            TABLE_NAME,
            " WHERE receiver_id = ? AND is_read IS FALSE GROUP BY conversation_id"
        );
        const PARTICIPANTS_QUERY: &str = const_str::concat!(
            "SELECT DISTINCT conversation_id, sender_id AS participant_id FROM ",
            TABLE_NAME,
            " WHERE sender_id IS NOT NULL UNION SELECT DISTINCT conversation_id, receiver_id FROM ",
            TABLE_NAME,
            " WHERE receiver_id IS NOT NULL"
        );

        let latest: Vec<Message> = sqlx::query_as(LATEST_QUERY).fetch_all(&self.db).await?;
        let unread: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(UNREAD_QUERY)
            .bind(receiver_id)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .collect();
        let mut participants: HashMap<String, BTreeSet<String>> = HashMap::new();
        let pairs: Vec<(String, String)> = sqlx::query_as(PARTICIPANTS_QUERY)
            .fetch_all(&self.db)
            .await?;
        for (conversation_id, participant_id) in pairs {
            participants
                .entry(conversation_id)
                .or_default()
                .insert(participant_id);
        }

        let rows = latest
            .into_iter()
            .map(|last_message| {
                let conversation_id = last_message.conversation_id.clone();
                ConversationRow {
                    unread_count: unread.get(&conversation_id).copied().unwrap_or(0) as u64,
                    participant_ids: participants
                        .remove(&conversation_id)
                        .map(|ids| ids.into_iter().collect())
                        .unwrap_or_default(),
                    conversation_id,
                    last_message,
                }
            })
            .collect();
        Ok(rows)
    }
}
