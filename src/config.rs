use std::fmt;

use anyhow::{Result, bail};

use crate::db::DatabaseConfig;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default token lifetime: 30 days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Signing configuration for bearer tokens.
///
/// There is no fallback secret. Construction fails when the secret is blank
/// so a misconfigured process never starts.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    ttl_secs: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl_secs: i64) -> Result<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            bail!("JWT secret must be set (use --jwt-secret or JWT_SECRET)");
        }
        if ttl_secs <= 0 {
            bail!("JWT TTL must be positive, got {}", ttl_secs);
        }
        Ok(Self { secret, ttl_secs })
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

/// Everything `serve` needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    pub token: TokenConfig,
}
