//! User context for request-scoped identity.

use serde::{Deserialize, Serialize};

use crate::db::schema::{UserProfile, UserRecord};
use crate::types::{Email, UserId};

/// Identity attached to a request once the auth gate has let it through.
///
/// Built from a freshly loaded [`UserRecord`], minus the password hash.
/// It is immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    profile: UserProfile,
}

impl UserContext {
    pub fn new(profile: UserProfile) -> Self {
        Self { profile }
    }

    /// Get the public user id.
    pub fn user_id(&self) -> &UserId {
        &self.profile.id
    }

    pub fn email(&self) -> &Email {
        &self.profile.email
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// The client-facing view of the user.
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn into_profile(self) -> UserProfile {
        self.profile
    }
}

impl From<UserRecord> for UserContext {
    fn from(record: UserRecord) -> Self {
        Self::new(record.into())
    }
}
