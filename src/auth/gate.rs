//! Bearer-token gate for protected routes.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::auth::context::UserContext;
use crate::auth::token::{TokenCodec, TokenError};
use crate::auth::user_store::UserStore;

/// Why a request counts as unauthenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// No `Bearer <token>` credential on the request
    NoToken,
    /// The token verified but its user no longer exists
    UserGone,
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Unauthenticated(UnauthenticatedReason),
    /// Malformed token or bad signature
    InvalidToken,
    /// Token past its expiry
    ExpiredToken,
    /// User lookup failed
    Database(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated(UnauthenticatedReason::NoToken) => {
                write!(f, "Not authorized, no token provided")
            }
            Self::Unauthenticated(UnauthenticatedReason::UserGone) => {
                write!(f, "The user belonging to this token no longer exists")
            }
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::ExpiredToken => write!(f, "Token expired"),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Expired => Self::ExpiredToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    authorization?
        .strip_prefix("Bearer ")?
        .split_whitespace()
        .next()
}

/// Verifies bearer tokens and re-resolves the user they name.
pub struct AuthGate {
    tokens: Arc<TokenCodec>,
    users: UserStore,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenCodec>, users: UserStore) -> Self {
        Self { tokens, users }
    }

    /// Judge one request's `Authorization` header.
    ///
    /// Each call is independent: no caching of verified tokens or users, so
    /// a deleted account is rejected on the very next request.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<UserContext, AuthError> {
        let token = bearer_token(authorization)
            .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::NoToken))?;

        let user_id = self.tokens.verify(token)?;

        let user = self
            .users
            .find_by_id(&user_id)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::UserGone))?;

        debug!("Authenticated user {}", user.user_id);

        Ok(UserContext::from(user))
    }
}

/// Route layer that admits only authenticated requests.
///
/// On success the [`UserContext`] is inserted into the request extensions
/// for handlers to pick up with `Extension<UserContext>`.
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    match gate.authenticate(authorization.as_deref()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            Ok(next.run(req).await)
        }
        Err(e) => {
            warn!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
            Err(e)
        }
    }
}
