//! Signed, time-bounded bearer tokens.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the public [`UserId`]. They
//! are stateless: nothing is stored server-side, so a token stays valid
//! until `exp` or until the signing secret changes.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TokenConfig;
use crate::types::UserId;

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (public user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed token or signature mismatch
    Invalid,
    /// Signature is fine but `exp` has passed
    Expired,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "Invalid token"),
            Self::Expired => write!(f, "Token expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies tokens under a single shared secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret().as_bytes()),
            decoding: DecodingKey::from_secret(config.secret().as_bytes()),
            validation,
            ttl: Duration::seconds(config.ttl_secs()),
        }
    }

    /// Issue a token for `user_id`, valid from now for the configured TTL.
    pub fn issue(&self, user_id: &UserId) -> Result<IssuedToken> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the current instant were `now`.
    pub fn issue_at(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expiration = now
            .checked_add_signed(self.ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")?;

        debug!("Issued token for user {}, expires at {}", user_id, expiration);

        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Verify signature and expiry, returning the encoded user id.
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(TokenError::Invalid);
        }

        Ok(UserId::new(data.claims.sub))
    }
}
