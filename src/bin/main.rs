use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use pharmascan_api::{
    DEFAULT_PORT, DEFAULT_TOKEN_TTL_SECS, DatabaseConfig, ServerConfig, TokenConfig,
};

#[derive(Parser)]
#[command(name = "pharmascan-api")]
#[command(about = "User signup, login and profile API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        #[command(flatten)]
        db: DbArgs,
        /// Secret used to sign bearer tokens (required, no default)
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,
        /// Token lifetime in seconds
        #[arg(long, env = "JWT_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
        jwt_ttl_secs: i64,
    },
    /// Connect to the database and apply the schema
    Init {
        #[command(flatten)]
        db: DbArgs,
    },
}

#[derive(Args)]
struct DbArgs {
    /// SurrealDB endpoint, or `memory` for an in-process store
    #[arg(long, env = "SURREALDB_URL", default_value = "ws://localhost:8000")]
    db_url: String,
    #[arg(long, env = "SURREALDB_NAMESPACE", default_value = "pharmascan")]
    db_namespace: String,
    #[arg(long, env = "SURREALDB_DATABASE", default_value = "api")]
    db_database: String,
    #[arg(long, env = "SURREALDB_USERNAME")]
    db_username: Option<String>,
    #[arg(long, env = "SURREALDB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,
}

impl From<DbArgs> for DatabaseConfig {
    fn from(args: DbArgs) -> Self {
        DatabaseConfig {
            url: args.db_url,
            namespace: args.db_namespace,
            database: args.db_database,
            username: args.db_username,
            password: args.db_password,
        }
    }
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; real environment variables still apply
    dotenv::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialise logging: {:#}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("pharmascan_api=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            port,
            db,
            jwt_secret,
            jwt_ttl_secs,
        } => {
            let config = ServerConfig {
                port,
                database: db.into(),
                token: TokenConfig::new(jwt_secret, jwt_ttl_secs)?,
            };
            info!("Using database url: {}", config.database.url);

            pharmascan_api::serve(config, shutdown_signal()).await?;
        }
        Commands::Init { db } => {
            let db_config: DatabaseConfig = db.into();
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = pharmascan_api::create_connection(db_config).await?;
            pharmascan_api::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }

    info!("Starting graceful shutdown...");
}
