//! Authentication: credentials, tokens and the request gate.
//!
//! - **Credential store**: users and their Argon2 password hashes in SurrealDB
//! - **Token codec**: HS256 bearer tokens carrying the public user id
//! - **Auth gate**: turns an `Authorization: Bearer <token>` header into a
//!   [`UserContext`], re-checking on every request that the user still exists
//!
//! ## Usage
//!
//! ```ignore
//! let gate = Arc::new(AuthGate::new(tokens.clone(), users.clone()));
//! let router = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(axum::middleware::from_fn_with_state(gate, require_auth));
//! ```

mod context;
mod gate;
mod password;
mod token;
mod user_store;

pub use context::UserContext;
pub use gate::{AuthError, AuthGate, UnauthenticatedReason, bearer_token, require_auth};
pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenCodec, TokenError};
pub use user_store::{NewUser, StoreError, UserStore};
