//! CLI command implementations.

pub mod city;
pub mod migrate;
pub mod sync;

use rescue_map_server::config::{ConfigError, ServerConfig};
use rescue_map_server::db::{self, RepositoryError};
use rescue_map_server::state::{AppState, StateError};
use rescue_map_server::sync::SyncError;
use sqlx::SqlitePool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Outbound clients could not be built.
    #[error("Startup error: {0}")]
    State(#[from] StateError),

    /// Sync operation failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Change set could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load configuration, connect and migrate.
async fn connect() -> Result<(ServerConfig, SqlitePool), CommandError> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;
    tracing::info!(database_url = %config.database_url, "Connecting to database...");
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::migrate(&pool).await?;
    Ok((config, pool))
}

/// Build the full application state, as the server does.
async fn app_state() -> Result<AppState, CommandError> {
    let (config, pool) = connect().await?;
    Ok(AppState::new(config, pool)?)
}

/// Print a JSON value on stdout.
fn print_json(value: &impl serde::Serialize) -> Result<(), CommandError> {
    let text = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{text}");
    }
    Ok(())
}
