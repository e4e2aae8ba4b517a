//! Database migration command.
//!
//! Migrations are embedded in the server crate (`crates/server/migrations/`)
//! and also run on server start-up; this command applies them ahead of time,
//! for example before the first deployment of a new version.

use super::{CommandError, connect};

/// Create or upgrade the database schema.
///
/// # Errors
///
/// Returns `CommandError` if the database cannot be reached or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let (config, pool) = connect().await?;
    tracing::info!(database_url = %config.database_url, "Migrations complete!");
    pool.close().await;
    Ok(())
}
