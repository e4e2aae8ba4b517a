//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::clock::VerificationClock;
use crate::config::ServerConfig;
use crate::fetch::{OverpassClient, OverpassError, ShopFetcher};
use crate::geocode::{CoordinateResolver, GeocodeError};
use crate::inventory::CityInventory;
use crate::sync::{SyncError, SyncManager};

/// Error wiring the outbound clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("geocoding client: {0}")]
    Geocode(#[from] GeocodeError),
    #[error("overpass client: {0}")]
    Overpass(#[from] OverpassError),
    #[error("sync client: {0}")]
    Sync(#[from] SyncError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, the city inventory and the sync manager.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    inventory: CityInventory,
    sync: SyncManager,
}

impl AppState {
    /// Create the application state with the production providers.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if an HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Result<Self, StateError> {
        let resolver = CoordinateResolver::standard(pool.clone(), &config.providers)?;
        let overpass = OverpassClient::from_config(&config.providers)?;
        let fetcher = ShopFetcher::new(
            resolver,
            Arc::new(overpass),
            ShopFetcher::rng_from_seed(config.synthetic_seed),
        );
        let clock = VerificationClock::new();
        let inventory = CityInventory::new(pool.clone(), fetcher, clock.clone());
        let sync = SyncManager::from_config(pool.clone(), &config.providers, clock)?;

        Ok(Self::from_parts(config, pool, inventory, sync))
    }

    /// Create the application state from already-built services.
    #[must_use]
    pub fn from_parts(
        config: ServerConfig,
        pool: SqlitePool,
        inventory: CityInventory,
        sync: SyncManager,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                inventory,
                sync,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the city inventory.
    #[must_use]
    pub fn inventory(&self) -> &CityInventory {
        &self.inner.inventory
    }

    /// Get a reference to the sync manager.
    #[must_use]
    pub fn sync(&self) -> &SyncManager {
        &self.inner.sync
    }
}
