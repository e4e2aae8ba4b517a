//! Sync commands: export to a file, import from a file, pull from a peer.

use std::path::Path;

use chrono::{DateTime, Utc};
use rescue_map_core::{SyncChangeSet, timestamp};
use rescue_map_server::clock::VerificationClock;
use rescue_map_server::sync::SyncManager;

use super::{CommandError, connect, print_json};

async fn manager() -> Result<SyncManager, CommandError> {
    let (config, pool) = connect().await?;
    Ok(SyncManager::from_config(
        pool,
        &config.providers,
        VerificationClock::new(),
    )?)
}

fn parse_since(since: Option<&str>) -> Result<DateTime<Utc>, CommandError> {
    since.map_or(Ok(DateTime::<Utc>::UNIX_EPOCH), |raw| {
        timestamp::parse(raw)
            .map_err(|e| CommandError::InvalidArgument(format!("--since {raw:?}: {e}")))
    })
}

/// Export rows verified after `since` (epoch when omitted).
///
/// # Errors
///
/// Returns `CommandError` if `since` is invalid, the store cannot be read
/// or the output file cannot be written.
pub async fn export(since: Option<&str>, output: Option<&Path>) -> Result<(), CommandError> {
    let since = parse_since(since)?;
    let change_set = manager().await?.export(since).await?;

    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_vec_pretty(&change_set)?)?;
            tracing::info!(
                count = change_set.len(),
                path = %path.display(),
                watermark = %timestamp::format(change_set.timestamp),
                "Change set written"
            );
            Ok(())
        }
        None => print_json(&change_set),
    }
}

/// Apply a change set file.
///
/// # Errors
///
/// Returns `CommandError` if the file cannot be read or decoded, or the
/// store cannot be written.
pub async fn import(file: &Path) -> Result<(), CommandError> {
    let change_set: SyncChangeSet = serde_json::from_slice(&std::fs::read(file)?)?;
    let report = manager().await?.import(&change_set).await?;
    print_json(&report)
}

/// Pull changes from a peer since the last successful pull.
///
/// # Errors
///
/// Returns `CommandError` if the peer cannot be reached or the store cannot
/// be written.
pub async fn pull(peer: &str) -> Result<(), CommandError> {
    let report = manager().await?.pull(peer).await?;
    print_json(&report)
}
