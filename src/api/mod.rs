//! REST API for user signup, login and profile.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthGate, TokenCodec, UserStore, require_auth};
use crate::config::TokenConfig;
use crate::db::Db;

mod error;
pub mod users;

#[cfg(test)]
mod integration_tests;

pub use error::{ApiError, handle_panic};

/// Shared per-request state. Cheap to clone; nothing in it is mutable.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub users: UserStore,
    pub tokens: Arc<TokenCodec>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(db: Db, token_config: &TokenConfig) -> Self {
        let users = UserStore::new(db.clone());
        let tokens = Arc::new(TokenCodec::new(token_config));
        let gate = Arc::new(AuthGate::new(tokens.clone(), users.clone()));

        Self {
            db,
            users,
            tokens,
            gate,
        }
    }
}

/// Build the full router.
///
/// Layers run outermost first: panic catcher, request tracing, CORS. The
/// auth gate is a route layer on `/me` only.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(users::me))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_auth,
        ));

    let user_routes = Router::new()
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route("/health", get(users::health))
        .merge(protected);

    Router::new()
        .route("/", get(root))
        .nest("/api/users", user_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "Pharma Scan API is running"
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
