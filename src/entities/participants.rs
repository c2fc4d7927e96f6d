use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Bearer session as written by the auth service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Session {
    pub user_id: String,
    pub role: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
    }
}
