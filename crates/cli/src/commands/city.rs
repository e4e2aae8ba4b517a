//! City inventory commands.

use std::collections::BTreeMap;

use rescue_map_core::CityName;
use rescue_map_server::db::SyncCursorRepository;
use serde_json::json;

use super::{CommandError, app_state, print_json};

fn parse_city(raw: &str) -> Result<CityName, CommandError> {
    CityName::parse(raw).map_err(|e| CommandError::InvalidArgument(format!("{raw:?}: {e}")))
}

/// Populate a city if it has no shops yet.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be reached.
pub async fn load(city: &str) -> Result<(), CommandError> {
    let city = parse_city(city)?;
    let state = app_state().await?;

    let load = state.inventory().ensure_populated(&city).await?;
    print_json(&load)
}

/// Replace a city's shops with a freshly fetched inventory.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be reached.
pub async fn reset(city: &str) -> Result<(), CommandError> {
    let city = parse_city(city)?;
    let state = app_state().await?;

    let reset = state.inventory().reset(&city).await?;
    print_json(&reset)
}

/// Print shop counts per city and the sync cursor of each peer.
///
/// # Errors
///
/// Returns `CommandError` if the store cannot be reached.
pub async fn status() -> Result<(), CommandError> {
    let state = app_state().await?;

    let cities: BTreeMap<String, i64> =
        state.inventory().city_counts().await?.into_iter().collect();
    let cursors = SyncCursorRepository::new(state.pool()).list().await?;

    print_json(&json!({
        "cities": cities,
        "total": cities.values().sum::<i64>(),
        "sync_cursors": cursors,
    }))
}
