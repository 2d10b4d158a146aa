//! User storage and credential checks.

use anyhow::{Context, anyhow};
use chrono::Utc;
use surrealdb::error::Db as DbError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::password::{DECOY_HASH, hash_password, verify_password};
use crate::db::Db;
use crate::db::schema::{UserCreate, UserRecord};
use crate::types::{Email, UserId};

/// Errors raised by [`UserStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The email is already registered
    #[error("user already exists")]
    DuplicateIdentity,
    /// The database rejected or failed the query
    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),
    /// Anything else (hashing, unexpected empty results)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Attempts at inserting a signup before a commit conflict is surfaced.
const CREATE_ATTEMPTS: usize = 3;

/// Signup input, before normalization and hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User store for database operations.
#[derive(Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a user, hashing the password before it is persisted.
    ///
    /// The record is keyed by the normalized email, so two signups for one
    /// identity collide on the key and at most one is stored. The loser gets
    /// [`StoreError::DuplicateIdentity`] whether it was stopped by the
    /// pre-check, the key, the email index or a commit conflict.
    pub async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let email = Email::normalize(&new_user.email);

        if self.find_by_identity(email.as_str()).await?.is_some() {
            debug!("Signup rejected, identity already registered: {}", email);
            return Err(StoreError::DuplicateIdentity);
        }

        let password = new_user.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("password hashing task failed")??;

        let create = UserCreate {
            user_id: UserId::generate(),
            name: new_user.name.trim().to_string(),
            email,
            password_hash,
            created_at: Utc::now().to_rfc3339(),
        };

        let mut attempt = 1;
        loop {
            let err = match self.insert(&create).await {
                Ok(user) => {
                    info!("Created user {} ({})", user.user_id, user.email);
                    return Ok(user);
                }
                Err(StoreError::Database(e)) => e,
                Err(other) => return Err(other),
            };

            if is_duplicate_key(&err) {
                debug!("Signup for {} lost to an existing record", create.email);
                return Err(StoreError::DuplicateIdentity);
            }

            // Remote engines report violations as plain text, and a commit
            // conflict may mean a concurrent signup for the same email won
            if self.find_by_identity(create.email.as_str()).await?.is_some() {
                debug!("Signup for {} lost to a concurrent signup: {}", create.email, err);
                return Err(StoreError::DuplicateIdentity);
            }

            if is_retryable_conflict(&err) && attempt < CREATE_ATTEMPTS {
                warn!("Signup for {} hit a write conflict, retrying", create.email);
                attempt += 1;
                continue;
            }

            return Err(StoreError::Database(err));
        }
    }

    async fn insert(&self, create: &UserCreate) -> Result<UserRecord, StoreError> {
        let query = r#"
            CREATE type::thing('user', $email) CONTENT {
                user_id: $user_id,
                name: $name,
                email: $email,
                password_hash: $password_hash,
                created_at: $created_at
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", create.user_id.clone()))
            .bind(("name", create.name.clone()))
            .bind(("email", create.email.clone()))
            .bind(("password_hash", create.password_hash.clone()))
            .bind(("created_at", create.created_at.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create user").into())
    }

    /// Look up a user by login identity. The email is normalized first.
    pub async fn find_by_identity(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = Email::normalize(email);

        let query = "SELECT * FROM user WHERE email = $email LIMIT 1";

        let mut res = self.db.query(query).bind(("email", email)).await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Look up a user by public id.
    pub async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let query = "SELECT * FROM user WHERE user_id = $user_id LIMIT 1";

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Check a plaintext secret against a stored hash on the blocking pool.
    pub async fn verify_secret(&self, plain: &str, hashed: &str) -> Result<bool, StoreError> {
        let plain = plain.to_string();
        let hashed = hashed.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&plain, &hashed))
            .await
            .context("password verification task failed")?;
        Ok(matches)
    }

    /// Resolve login credentials. `None` means unknown email or wrong password.
    ///
    /// An unknown email is still checked against [`DECOY_HASH`], so both
    /// failures take the same time.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let user = self.find_by_identity(email).await?;
        let hashed = user
            .as_ref()
            .map_or(DECOY_HASH, |user| user.password_hash.as_str());

        let matches = self.verify_secret(password, hashed).await?;
        Ok(user.filter(|_| matches))
    }

    /// Delete a user. Returns whether a record was removed.
    pub async fn delete_user(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let query = "DELETE user WHERE user_id = $user_id RETURN BEFORE";

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id.clone()))
            .await?;

        let removed: Vec<UserRecord> = res.take(0)?;
        if !removed.is_empty() {
            info!("Deleted user {}", user_id);
        }
        Ok(!removed.is_empty())
    }
}

/// The record key or a unique index already holds this identity.
fn is_duplicate_key(err: &surrealdb::Error) -> bool {
    matches!(
        err,
        surrealdb::Error::Db(DbError::RecordExists { .. } | DbError::IndexExists { .. })
    )
}

fn is_retryable_conflict(err: &surrealdb::Error) -> bool {
    matches!(err, surrealdb::Error::Db(DbError::TxRetryable))
}
