//! Shop inventory fetching.
//!
//! [`ShopFetcher::fetch`] resolves the city, asks a [`PoiSource`] (Overpass in
//! production) for shops around it and falls back to [`synthetic::generate`]
//! when the city could not be located or the source fails or finds nothing.
//! Fetching never fails.

mod overpass;
pub mod synthetic;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, instrument, warn};

use rescue_map_core::{CityName, Coordinates, ShopCandidate};

use crate::geocode::{CoordinateResolver, Resolution};

pub use overpass::{OverpassClient, OverpassError};

/// A provider of shop points of interest around a center.
#[async_trait]
pub trait PoiSource: Send + Sync {
    /// Find shops within `center.radius` of `center`.
    async fn find(
        &self,
        city: &CityName,
        center: &Coordinates,
    ) -> Result<Vec<ShopCandidate>, OverpassError>;
}

/// Where a fetched inventory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySource {
    Overpass,
    Synthetic,
}

/// Result of fetching a city's shops.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedInventory {
    /// Resolved city center.
    pub center: Resolution,
    /// Provider of the candidates.
    pub source: InventorySource,
    /// Shops to persist; never empty.
    pub candidates: Vec<ShopCandidate>,
}

/// Fetches shop inventories, with a synthetic fallback.
pub struct ShopFetcher {
    resolver: CoordinateResolver,
    pois: Arc<dyn PoiSource>,
    rng: Mutex<StdRng>,
}

impl ShopFetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new(resolver: CoordinateResolver, pois: Arc<dyn PoiSource>, rng: StdRng) -> Self {
        Self {
            resolver,
            pois,
            rng: Mutex::new(rng),
        }
    }

    /// Random source for synthetic inventories: seeded when `seed` is set,
    /// from OS entropy otherwise.
    #[must_use]
    pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
        seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
    }

    /// The resolver used to locate cities.
    #[must_use]
    pub const fn resolver(&self) -> &CoordinateResolver {
        &self.resolver
    }

    /// Fetch the shops of a city.
    #[instrument(skip(self), fields(city = %city))]
    pub async fn fetch(&self, city: &CityName) -> FetchedInventory {
        let center = self.resolver.resolve(city).await;

        if center.is_fallback() {
            info!("City not located, generating synthetic inventory");
            return self.synthetic(city, center);
        }

        match self.pois.find(city, &center.coordinates).await {
            Ok(candidates) if !candidates.is_empty() => {
                info!(count = candidates.len(), "Fetched shops from Overpass");
                FetchedInventory {
                    center,
                    source: InventorySource::Overpass,
                    candidates,
                }
            }
            Ok(_) => {
                info!("Overpass found no shops, generating synthetic inventory");
                self.synthetic(city, center)
            }
            Err(e) => {
                warn!(error = %e, "Overpass unavailable, generating synthetic inventory");
                self.synthetic(city, center)
            }
        }
    }

    fn synthetic(&self, city: &CityName, center: Resolution) -> FetchedInventory {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let candidates = synthetic::generate(city, &center.coordinates, &mut *rng);

        FetchedInventory {
            center,
            source: InventorySource::Synthetic,
            candidates,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::geocode::{KnownCities, ResolutionSource};

    /// Test POI source returning fixed candidates, an error, or nothing.
    pub(crate) struct StubPois {
        pub answer: Option<Vec<ShopCandidate>>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubPois {
        pub(crate) fn returning(candidates: Vec<ShopCandidate>) -> Self {
            Self {
                answer: Some(candidates),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                answer: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PoiSource for StubPois {
        async fn find(
            &self,
            _city: &CityName,
            _center: &Coordinates,
        ) -> Result<Vec<ShopCandidate>, OverpassError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent callers interleave
            tokio::task::yield_now().await;
            self.answer.clone().ok_or_else(|| OverpassError::Api {
                status: 504,
                message: "gateway timeout".to_string(),
            })
        }
    }

    pub(crate) fn candidate(name: &str) -> ShopCandidate {
        ShopCandidate {
            name: name.to_string(),
            lat: 43.60,
            lon: 1.44,
            kind: "supermarket".to_string(),
        }
    }

    pub(crate) fn known_cities_fetcher(pois: StubPois) -> ShopFetcher {
        ShopFetcher::new(
            CoordinateResolver::new(vec![Arc::new(KnownCities)]),
            Arc::new(pois),
            StdRng::seed_from_u64(1),
        )
    }

    fn city(name: &str) -> CityName {
        CityName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_uses_overpass_results() {
        let fetcher = known_cities_fetcher(StubPois::returning(vec![candidate("Lidl")]));
        let fetched = fetcher.fetch(&city("Toulouse")).await;

        assert_eq!(fetched.source, InventorySource::Overpass);
        assert_eq!(fetched.center.source, ResolutionSource::KnownCity);
        assert_eq!(fetched.candidates, vec![candidate("Lidl")]);
    }

    #[tokio::test]
    async fn test_empty_overpass_answer_goes_synthetic() {
        let fetcher = known_cities_fetcher(StubPois::returning(Vec::new()));
        let fetched = fetcher.fetch(&city("Lyon")).await;

        assert_eq!(fetched.source, InventorySource::Synthetic);
        assert!(fetched.candidates.len() >= synthetic::MIN_SHOPS);
    }

    #[tokio::test]
    async fn test_overpass_failure_goes_synthetic() {
        let fetcher = known_cities_fetcher(StubPois::failing());
        let fetched = fetcher.fetch(&city("Nice")).await;

        assert_eq!(fetched.source, InventorySource::Synthetic);
        assert!(!fetched.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unlocated_city_skips_overpass() {
        let pois = StubPois::returning(vec![candidate("Lidl")]);
        let calls = Arc::clone(&pois.calls);
        let fetcher = known_cities_fetcher(pois);

        let fetched = fetcher.fetch(&city("Trifouilly-les-Oies")).await;

        assert!(fetched.center.is_fallback());
        assert_eq!(fetched.source, InventorySource::Synthetic);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
