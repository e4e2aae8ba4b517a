//! Integration tests for RescueMap.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rescue-map-integration-tests
//! ```
//!
//! Every test gets its own in-memory SQLite store and drives the real router
//! with `tower::ServiceExt::oneshot`. Coordinates come from the known-city
//! table and stored shops only, and shops from a fixed [`FixedPois`] source,
//! so no test touches the network.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use rescue_map_core::{CityName, Coordinates, ShopCandidate};
use rescue_map_server::clock::VerificationClock;
use rescue_map_server::config::{ProviderConfig, ServerConfig};
use rescue_map_server::fetch::{OverpassError, PoiSource, ShopFetcher};
use rescue_map_server::geocode::{CoordinateResolver, KnownCities, StoredShops};
use rescue_map_server::inventory::CityInventory;
use rescue_map_server::state::AppState;
use rescue_map_server::sync::SyncManager;
use rescue_map_server::{app, db};

/// POI source answering every city with the same shops, or failing.
pub struct FixedPois {
    shops: Option<Vec<ShopCandidate>>,
    calls: Arc<AtomicUsize>,
}

impl FixedPois {
    /// Answer with `names`, placed around the requested center.
    #[must_use]
    pub fn named(names: &[&str]) -> Self {
        let shops = names
            .iter()
            .map(|name| ShopCandidate {
                name: (*name).to_string(),
                lat: 0.0,
                lon: 0.0,
                kind: "supermarket".to_string(),
            })
            .collect();
        Self {
            shops: Some(shops),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call, forcing synthetic inventories.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            shops: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl PoiSource for FixedPois {
    async fn find(
        &self,
        _city: &CityName,
        center: &Coordinates,
    ) -> Result<Vec<ShopCandidate>, OverpassError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let shops = self.shops.as_ref().ok_or_else(|| OverpassError::Api {
            status: 503,
            message: "unavailable".to_string(),
        })?;

        Ok(shops
            .iter()
            .enumerate()
            .map(|(i, shop)| {
                #[allow(clippy::cast_precision_loss)]
                let offset = i as f64 * 0.001;
                ShopCandidate {
                    lat: center.lat + offset,
                    lon: center.lon + offset,
                    ..shop.clone()
                }
            })
            .collect())
    }
}

/// A server wired to an in-memory store and offline providers.
pub struct TestContext {
    pub pool: SqlitePool,
    pub state: AppState,
    pub router: Router,
    pub poi_calls: Arc<AtomicUsize>,
}

impl TestContext {
    /// Create a context whose POI source returns `names` for every city.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store cannot be created.
    pub async fn with_shops(names: &[&str]) -> Self {
        Self::with_pois(FixedPois::named(names)).await
    }

    /// Create a context around an explicit POI source.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store cannot be created.
    #[allow(clippy::unwrap_used)]
    pub async fn with_pois(pois: FixedPois) -> Self {
        let pool = db::memory_store().await.unwrap();
        let poi_calls = Arc::clone(&pois.calls);

        let resolver = CoordinateResolver::new(vec![
            Arc::new(KnownCities),
            Arc::new(StoredShops::new(pool.clone())),
        ]);
        let fetcher = ShopFetcher::new(resolver, Arc::new(pois), StdRng::seed_from_u64(7));
        let clock = VerificationClock::new();
        let inventory = CityInventory::new(pool.clone(), fetcher, clock.clone());
        let sync = SyncManager::new(pool.clone(), reqwest::Client::new(), clock);

        let state = AppState::from_parts(test_config(), pool.clone(), inventory, sync);
        let router = app(state.clone());

        Self {
            pool,
            state,
            router,
            poi_calls,
        }
    }

    /// Number of POI lookups made so far.
    #[must_use]
    pub fn poi_calls(&self) -> usize {
        self.poi_calls.load(Ordering::SeqCst)
    }

    /// Send a GET request and decode the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    #[allow(clippy::unwrap_used)]
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Send a POST request with a JSON body and decode the JSON answer.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    #[allow(clippy::unwrap_used)]
    pub async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    #[allow(clippy::unwrap_used)]
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

/// Configuration for tests; only read for display and provider settings.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        providers: ProviderConfig::default(),
        synthetic_seed: Some(7),
        sentry_dsn: None,
        sentry_environment: None,
    }
}
