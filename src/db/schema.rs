use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::types::{Email, UserId};

/// Persisted user account in SurrealDB (table: `user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Internal database identifier. Not exposed to clients.
    pub id: RecordId,
    /// Public identifier, carried in tokens.
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Login identity (normalized email)
    pub email: Email,
    /// Argon2 PHC string
    pub password_hash: String,
    /// RFC 3339 creation instant
    pub created_at: String,
}

/// Payload for inserting a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub user_id: UserId,
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub created_at: String,
}

/// Client-facing projection of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub created_at: String,
}

impl From<&UserRecord> for UserProfile {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.user_id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            created_at: record.created_at.clone(),
        }
    }
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.user_id,
            name: record.name,
            email: record.email,
            created_at: record.created_at,
        }
    }
}
