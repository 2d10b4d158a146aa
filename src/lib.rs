mod config;
pub mod db;
pub mod api;
pub mod auth;
mod types;

// Re-export key types and functions
pub use api::{ApiError, AppState, create_router};
pub use auth::{AuthError, AuthGate, TokenCodec, UserContext, UserStore};
pub use config::{DEFAULT_PORT, DEFAULT_TOKEN_TTL_SECS, ServerConfig, TokenConfig};
pub use db::{ConnectionState, DatabaseConfig, Db, check_connection, create_connection, ensure_schema};
pub use types::{Email, UserId};

use anyhow::Result;
use tracing::info;

/// Serve the API until shutdown is signalled.
///
/// Connects to the database and applies the schema first. Failure to
/// reach the store is returned as an error, so the caller exits before
/// binding the port.
pub async fn serve(
    config: ServerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let db = create_connection(config.database).await?;
    ensure_schema(&db).await?;

    let state = AppState::new(db, &config.token);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped; database connection released");
    Ok(())
}
