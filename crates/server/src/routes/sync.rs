//! Sync route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rescue_map_core::{SyncChangeSet, timestamp};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// `?since=` query parameter; RFC 3339, epoch when absent.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub since: Option<String>,
}

/// Response of `POST /api/sync/import`.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: u64,
    pub skipped: usize,
}

fn parse_since(since: Option<&str>) -> Result<DateTime<Utc>> {
    since.map_or(Ok(DateTime::<Utc>::UNIX_EPOCH), |raw| {
        timestamp::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid since: {e}")))
    })
}

/// Export rows verified after `since`.
#[instrument(skip(state))]
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<SyncChangeSet>> {
    let since = parse_since(query.since.as_deref())?;
    let change_set = state.sync().export(since).await?;
    Ok(Json(change_set))
}

/// Apply a change set from another node.
#[instrument(skip(state, change_set), fields(count = change_set.len()))]
pub async fn import(
    State(state): State<AppState>,
    Json(change_set): Json<SyncChangeSet>,
) -> Result<Json<ImportResponse>> {
    let report = state.sync().import(&change_set).await?;

    Ok(Json(ImportResponse {
        success: true,
        imported: report.imported,
        skipped: report.skipped,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_since() {
        assert_eq!(parse_since(None).unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(
            parse_since(Some("2026-03-01T10:00:00+01:00")).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
        );
        assert!(matches!(
            parse_since(Some("yesterday")),
            Err(AppError::BadRequest(_))
        ));
    }
}
