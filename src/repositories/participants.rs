use crate::common::redis_json::Json;
use crate::common::redis_pool::RedisPool;
use crate::entities::participants::{Account, Session};
use async_trait::async_trait;
use redis::AsyncCommands;
use sqlx::{MySql, Pool};

/// Accounts and bearer sessions owned by the user and auth services.
/// The messaging core only reads through this seam.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Resolves a bearer token to its session, `None` when unknown or expired.
    async fn fetch_session(&self, token: &str) -> anyhow::Result<Option<Session>>;

    async fn fetch_admin(&self) -> anyhow::Result<Option<Account>>;

    async fn fetch_one(&self, participant_id: &str) -> anyhow::Result<Option<Account>>;
}

const TABLE_NAME: &str = "users";
const READ_FIELDS: &str = "id, name, email, role";
const SESSIONS_KEY: &str = "marketplace:sessions";

pub struct SqlParticipantDirectory {
    db: Pool<MySql>,
    redis: RedisPool,
}

impl SqlParticipantDirectory {
    pub fn new(db: Pool<MySql>, redis: RedisPool) -> Self {
        Self { db, redis }
    }
}

#[async_trait]
impl ParticipantDirectory for SqlParticipantDirectory {
    async fn fetch_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let mut redis = self.redis.get().await?;
        let session: Option<Json<Session>> = redis.hget(SESSIONS_KEY, token).await?;
        Ok(session
            .map(Json::into_inner)
            .filter(|session| !session.is_expired()))
    }

    async fn fetch_admin(&self) -> anyhow::Result<Option<Account>> {
        const QUERY: &str = const_str::concat!(
            "SELECT ",
            READ_FIELDS,
            " FROM ",
            TABLE_NAME,
            " WHERE role = 'admin' ORDER BY id ASC LIMIT 1"
        );
        let admin = sqlx::query_as(QUERY).fetch_optional(&self.db).await?;
        Ok(admin)
    }

    async fn fetch_one(&self, participant_id: &str) -> anyhow::Result<Option<Account>> {
        const QUERY: &str = const_str::concat!(
            "SELECT ",
            READ_FIELDS,
            " FROM ",
            TABLE_NAME,
            " WHERE id = ?"
        );
        let account = sqlx::query_as(QUERY)
            .bind(participant_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }
}
