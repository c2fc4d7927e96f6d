use crate::common::error::AppError;
use crate::entities::participants::{Account as AccountEntity, Session as SessionEntity};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque account identifier. Only ever compared, sorted and printed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = AppError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::Unexpected),
        }
    }
}

/// An authenticated (or resolved) party of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub role: Role,
}

impl Participant {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public display fields attached to messages and conversation listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub participant: Participant,
    pub profile: ParticipantProfile,
}

impl TryFrom<AccountEntity> for Account {
    type Error = AppError;

    fn try_from(value: AccountEntity) -> Result<Self, Self::Error> {
        let id = ParticipantId::from(value.id);
        let role = Role::try_from(value.role.as_str())?;
        Ok(Self {
            participant: Participant {
                id: id.clone(),
                role,
            },
            profile: ParticipantProfile {
                id,
                name: value.name,
                email: value.email,
            },
        })
    }
}

impl TryFrom<SessionEntity> for Participant {
    type Error = AppError;

    fn try_from(value: SessionEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ParticipantId::from(value.user_id),
            role: Role::try_from(value.role.as_str())?,
        })
    }
}
