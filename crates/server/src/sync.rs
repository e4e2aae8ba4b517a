//! Change-set exchange between independent RescueMap stores.
//!
//! A node exports the rows whose `last_verified` is newer than a watermark;
//! another node imports them as whole rows keyed by id (last write wins).
//! [`SyncManager::pull`] chains both over HTTP and remembers the watermark
//! per peer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use rescue_map_core::{CityName, Shop, SyncChangeSet, timestamp};

use crate::clock::VerificationClock;
use crate::config::ProviderConfig;
use crate::db::{RepositoryError, ShopRepository, SyncCursorRepository};

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store read or write failed.
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    /// HTTP request to the peer failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Peer answered with a non-success status.
    #[error("peer error: status {status} - {message}")]
    Peer { status: u16, message: String },

    /// Peer URL is invalid.
    #[error("invalid peer URL: {0}")]
    Url(#[from] url::ParseError),

    /// Peer answered with an undecodable change set.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows written.
    pub imported: u64,
    /// Rows rejected before writing.
    pub skipped: usize,
}

/// Outcome of a pull from a peer.
#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub peer: String,
    pub since: DateTime<Utc>,
    pub watermark: DateTime<Utc>,
    pub imported: u64,
    pub skipped: usize,
}

/// Exports, imports and pulls change sets.
#[derive(Clone)]
pub struct SyncManager {
    pool: SqlitePool,
    client: reqwest::Client,
    clock: VerificationClock,
}

impl SyncManager {
    /// Create a sync manager over a store.
    ///
    /// `clock` must be the one stamping local writes to the same store.
    #[must_use]
    pub const fn new(pool: SqlitePool, client: reqwest::Client, clock: VerificationClock) -> Self {
        Self {
            pool,
            client,
            clock,
        }
    }

    /// Create a sync manager with an HTTP client built from provider settings.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Http` if the HTTP client fails to build.
    pub fn from_config(
        pool: SqlitePool,
        providers: &ProviderConfig,
        clock: VerificationClock,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(providers.user_agent.clone())
            .build()?;

        Ok(Self::new(pool, client, clock))
    }

    /// Rows verified strictly after `since`.
    ///
    /// The change set's timestamp is taken once every local write in flight
    /// has committed, and before the query. Every row left out is stamped
    /// after it; rows written during the query may be sent twice.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn export(&self, since: DateTime<Utc>) -> Result<SyncChangeSet, SyncError> {
        let timestamp = self.clock.watermark().await;
        let changes = ShopRepository::new(&self.pool).changed_since(since).await?;
        info!(count = changes.len(), "Exported changes");

        Ok(SyncChangeSet { timestamp, changes })
    }

    /// Apply a change set, replacing rows by id in array order.
    ///
    /// City names are trimmed and checked like user input. Rows with an
    /// invalid city or out-of-range coordinates are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the write fails; nothing is applied then.
    #[instrument(skip(self, change_set), fields(count = change_set.len()))]
    pub async fn import(&self, change_set: &SyncChangeSet) -> Result<ImportReport, SyncError> {
        let mut valid = Vec::with_capacity(change_set.len());
        let mut skipped = 0;
        for shop in &change_set.changes {
            match normalize(shop) {
                Ok(shop) => valid.push(shop),
                Err(reason) => {
                    warn!(
                        id = %shop.id,
                        city = ?shop.city,
                        reason = %reason,
                        "Skipping invalid row in change set"
                    );
                    skipped += 1;
                }
            }
        }

        let imported = ShopRepository::new(&self.pool).upsert_all(&valid).await?;
        info!(imported, skipped, "Imported changes");

        Ok(ImportReport { imported, skipped })
    }

    /// Pull changes from a peer since its stored watermark, then advance it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the peer cannot be reached or answers badly,
    /// or if the store cannot be written. The watermark is only advanced
    /// after a successful import.
    #[instrument(skip(self))]
    pub async fn pull(&self, peer_url: &str) -> Result<PullReport, SyncError> {
        let peer = peer_url.trim_end_matches('/').to_string();
        let cursors = SyncCursorRepository::new(&self.pool);
        let since = cursors
            .get(&peer)
            .await?
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |cursor| cursor.watermark);

        let url = export_url(&peer, since)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Peer {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let change_set: SyncChangeSet =
            serde_json::from_str(&body).map_err(|e| SyncError::Parse(e.to_string()))?;

        let report = self.import(&change_set).await?;
        cursors
            .advance(&peer, change_set.timestamp, Utc::now())
            .await?;

        Ok(PullReport {
            peer,
            since,
            watermark: change_set.timestamp,
            imported: report.imported,
            skipped: report.skipped,
        })
    }
}

/// Validate an incoming row and store its city the way local loads do.
fn normalize(shop: &Shop) -> Result<Shop, String> {
    if !(-90.0..=90.0).contains(&shop.lat) || !(-180.0..=180.0).contains(&shop.lon) {
        return Err("coordinates out of range".to_string());
    }
    let city = CityName::parse(&shop.city).map_err(|e| e.to_string())?;

    Ok(Shop {
        city: city.into_inner(),
        ..shop.clone()
    })
}

fn export_url(peer: &str, since: DateTime<Utc>) -> Result<Url, SyncError> {
    let since = timestamp::format(since);
    let url = Url::parse_with_params(
        &format!("{peer}/api/sync/export"),
        &[("since", since.as_str())],
    )?;
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rescue_map_core::{CityName, ShopCandidate, ShopId, ShopStatus};

    use super::*;
    use crate::db::memory_store;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    async fn seeded_manager() -> SyncManager {
        let pool = memory_store().await.unwrap();
        let candidates: Vec<_> = ["Auchan", "Lidl", "Spar"]
            .iter()
            .map(|name| ShopCandidate {
                name: (*name).to_string(),
                lat: 45.76,
                lon: 4.83,
                kind: "supermarket".to_string(),
            })
            .collect();
        ShopRepository::new(&pool)
            .insert_inventory(&CityName::parse("Lyon").unwrap(), &candidates, at(8))
            .await
            .unwrap();
        SyncManager::new(pool, reqwest::Client::new(), VerificationClock::new())
    }

    #[tokio::test]
    async fn test_export_then_import_into_empty_store() {
        let source = seeded_manager().await;
        let exported = source.export(at(7)).await.unwrap();
        assert_eq!(exported.len(), 3);

        let target = SyncManager::new(
            memory_store().await.unwrap(),
            reqwest::Client::new(),
            VerificationClock::new(),
        );
        let report = target.import(&exported).await.unwrap();
        assert_eq!(report, ImportReport { imported: 3, skipped: 0 });

        let reexported = target.export(at(7)).await.unwrap();
        assert_eq!(reexported.changes, exported.changes);
    }

    #[tokio::test]
    async fn test_export_after_last_write_is_empty() {
        let manager = seeded_manager().await;
        assert!(manager.export(at(8)).await.unwrap().is_empty());
        assert!(manager.export(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_skips_invalid_rows() {
        let manager = seeded_manager().await;
        let mut change_set = manager.export(at(7)).await.unwrap();
        change_set.changes[0].lat = 91.0;
        change_set.changes[1].city = "  ".to_string();

        let report = manager.import(&change_set).await.unwrap();
        assert_eq!(report, ImportReport { imported: 1, skipped: 2 });
    }

    #[tokio::test]
    async fn test_import_stores_city_like_local_loads() {
        let manager = seeded_manager().await;
        let mut change_set = manager.export(at(7)).await.unwrap();
        change_set.changes[0].city = " Lyon ".to_string();
        change_set.changes[1].city = "Ly\u{0}on".to_string();
        change_set.changes[2].city = "x".repeat(CityName::MAX_LENGTH + 1);

        let report = manager.import(&change_set).await.unwrap();
        assert_eq!(report, ImportReport { imported: 1, skipped: 2 });

        let repo = ShopRepository::new(&manager.pool);
        let stored = repo.get(change_set.changes[0].id).await.unwrap().unwrap();
        assert_eq!(stored.city, "Lyon");
        assert_eq!(repo.list_by_city(&CityName::parse("lyon").unwrap()).await.unwrap().len(), 3);
        assert_eq!(repo.city_counts().await.unwrap(), vec![("Lyon".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_write_in_flight_during_export_is_not_lost() {
        let clock = VerificationClock::new();
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);
        let lyon = CityName::parse("Lyon").unwrap();
        let candidate = ShopCandidate {
            name: "Casino".to_string(),
            lat: 45.76,
            lon: 4.83,
            kind: "supermarket".to_string(),
        };
        repo.insert_inventory(&lyon, &[candidate], at(8)).await.unwrap();
        let id = repo.list_by_city(&lyon).await.unwrap()[0].id;
        let manager = SyncManager::new(pool.clone(), reqwest::Client::new(), clock.clone());

        // Stamp taken, row not yet written
        let stamp = clock.stamp().await;
        let export = tokio::spawn({
            let manager = manager.clone();
            async move { manager.export(at(9)).await }
        });
        tokio::task::yield_now().await;
        assert!(!export.is_finished());

        repo.update_status(id, &lyon, ShopStatus::Looted, None, stamp.at)
            .await
            .unwrap();
        drop(stamp);

        let change_set = export.await.unwrap().unwrap();
        assert_eq!(change_set.len(), 1);
        assert_eq!(change_set.changes[0].status, ShopStatus::Looted);
        assert!(change_set.changes[0].last_verified < Some(change_set.timestamp));
    }

    #[tokio::test]
    async fn test_import_overwrites_whole_row() {
        let manager = seeded_manager().await;
        let mut change_set = manager.export(at(7)).await.unwrap();
        let target_id: ShopId = change_set.changes[0].id;
        change_set.changes.truncate(1);
        change_set.changes[0].status = ShopStatus::Looted;
        change_set.changes[0].notes = Some("rideau baissé".to_string());
        change_set.changes[0].last_verified = Some(at(12));

        manager.import(&change_set).await.unwrap();

        let stored = ShopRepository::new(&manager.pool)
            .get(target_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, change_set.changes[0]);
    }

    #[test]
    fn test_export_url() {
        let url = export_url("http://10.0.0.2:5000", at(9)).unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.0.0.2:5000/api/sync/export?since=2026-03-01T09%3A00%3A00.000000Z"
        );
    }

    #[tokio::test]
    async fn test_pull_from_unreachable_peer_keeps_cursor() {
        let manager = seeded_manager().await;
        let result = manager.pull("http://127.0.0.1:9").await;
        assert!(result.is_err());

        let cursor = SyncCursorRepository::new(&manager.pool)
            .get("http://127.0.0.1:9")
            .await
            .unwrap();
        assert!(cursor.is_none());
    }
}
