//! Per-city shop inventories: first-touch population, reset and status updates.
//!
//! Population and reset of a city are serialized by a per-city async lock
//! keyed by the lowercase city name, so two first touches of the same city
//! fetch once. Different cities never contend. A city's lock is dropped from
//! the map once nobody holds or waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument};

use rescue_map_core::{CityName, Shop, ShopId, ShopStatus};

use crate::clock::VerificationClock;
use crate::db::{RepositoryError, ShopRepository};
use crate::fetch::{InventorySource, ShopFetcher};
use crate::geocode::Resolution;

/// Outcome of [`CityInventory::ensure_populated`].
#[derive(Debug, Clone, Serialize)]
pub struct CityLoad {
    /// City name as requested.
    pub city: String,
    /// Where the city was located.
    pub resolution: Resolution,
    /// Shops stored for the city after the call.
    pub count: i64,
    /// Shops inserted by this call; zero when the city was already populated.
    pub inserted: u64,
    /// Provider of the inserted shops, when any were inserted.
    pub source: Option<InventorySource>,
}

/// Outcome of [`CityInventory::reset`].
#[derive(Debug, Clone, Serialize)]
pub struct CityReset {
    pub city: String,
    pub resolution: Resolution,
    pub deleted: u64,
    pub inserted: u64,
    pub source: InventorySource,
}

type CityLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Holds a city's lock and prunes the map entry when released.
struct CityGuard<'a> {
    locks: &'a CityLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CityGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        // Waiters hold their own clone, so one reference means only the map's
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.key);
        }
    }
}

/// City inventory service.
#[derive(Clone)]
pub struct CityInventory {
    inner: Arc<CityInventoryInner>,
}

struct CityInventoryInner {
    pool: SqlitePool,
    fetcher: ShopFetcher,
    clock: VerificationClock,
    locks: CityLocks,
}

impl CityInventory {
    /// Create an inventory over a store and a fetcher.
    ///
    /// `clock` must be shared with the [`SyncManager`](crate::sync::SyncManager)
    /// exporting from the same store.
    #[must_use]
    pub fn new(pool: SqlitePool, fetcher: ShopFetcher, clock: VerificationClock) -> Self {
        Self {
            inner: Arc::new(CityInventoryInner {
                pool,
                fetcher,
                clock,
                locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn repo(&self) -> ShopRepository<'_> {
        ShopRepository::new(&self.inner.pool)
    }

    async fn lock_city(&self, city: &CityName) -> CityGuard<'_> {
        let key = city.key();
        let lock = {
            let mut locks = self
                .inner
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        CityGuard {
            locks: &self.inner.locks,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Make sure a city has shops, fetching and storing them on first touch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read or written.
    #[instrument(skip(self), fields(city = %city))]
    pub async fn ensure_populated(&self, city: &CityName) -> Result<CityLoad, RepositoryError> {
        let _city_lock = self.lock_city(city).await;

        let existing = self.repo().count_by_city(city).await?;
        if existing > 0 {
            let resolution = self.inner.fetcher.resolver().resolve(city).await;
            return Ok(CityLoad {
                city: city.to_string(),
                resolution,
                count: existing,
                inserted: 0,
                source: None,
            });
        }

        let fetched = self.inner.fetcher.fetch(city).await;
        let inserted = {
            let stamp = self.inner.clock.stamp().await;
            self.repo()
                .insert_inventory(city, &fetched.candidates, stamp.at)
                .await?
        };
        info!(inserted, source = ?fetched.source, "City populated");

        Ok(CityLoad {
            city: city.to_string(),
            resolution: fetched.center,
            count: self.repo().count_by_city(city).await?,
            inserted,
            source: Some(fetched.source),
        })
    }

    /// Replace a city's shops with a freshly fetched inventory.
    ///
    /// Old rows are deleted and new ones inserted in one transaction, after
    /// the fetch completes. Ids are not preserved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be written; the previous
    /// inventory is kept in that case.
    #[instrument(skip(self), fields(city = %city))]
    pub async fn reset(&self, city: &CityName) -> Result<CityReset, RepositoryError> {
        let _city_lock = self.lock_city(city).await;

        let fetched = self.inner.fetcher.fetch(city).await;
        let (deleted, inserted) = {
            let stamp = self.inner.clock.stamp().await;
            self.repo()
                .replace_inventory(city, &fetched.candidates, stamp.at)
                .await?
        };
        info!(deleted, inserted, source = ?fetched.source, "City reset");

        Ok(CityReset {
            city: city.to_string(),
            resolution: fetched.center,
            deleted,
            inserted,
            source: fetched.source,
        })
    }

    /// Shops of a city, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn list(&self, city: &CityName) -> Result<Vec<Shop>, RepositoryError> {
        self.repo().list_by_city(city).await
    }

    /// Record a status report for a shop, stamping `last_verified` with now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop is not in that city.
    #[instrument(skip(self, notes), fields(city = %city, id = %id))]
    pub async fn update_status(
        &self,
        id: ShopId,
        city: &CityName,
        status: ShopStatus,
        notes: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let stamp = self.inner.clock.stamp().await;
        self.repo()
            .update_status(id, city, status, notes, stamp.at)
            .await?;
        drop(stamp);
        info!(%status, "Shop status updated");
        Ok(())
    }

    /// Shop counts per city.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be read.
    pub async fn city_counts(&self) -> Result<Vec<(String, i64)>, RepositoryError> {
        self.repo().city_counts().await
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.inner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
