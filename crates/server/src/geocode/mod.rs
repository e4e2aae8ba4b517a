//! City name → coordinates resolution.
//!
//! # Architecture
//!
//! Resolution walks an ordered list of [`CoordinateSource`] strategies and
//! takes the first answer:
//!
//! 1. [`KnownCities`] - curated table, exact title-case match
//! 2. [`StoredShops`] - coordinates of a shop already stored for the city
//! 3. [`NominatimClient`] - OpenStreetMap geocoder (`"<city>, France"`)
//! 4. [`AdresseClient`] - French government address API
//! 5. [`FuzzyKnownCities`] - substring / separator-insensitive table match
//!
//! When every source declines or fails, the national centroid is returned.
//! Source errors are logged and never reach the caller.
//!
//! Remote sources are wrapped in [`CachedSource`] (`moka`, 1 hour TTL).

mod adresse;
mod cache;
mod known;
mod nominatim;
mod stored;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use rescue_map_core::{CityName, Coordinates};

use crate::config::ProviderConfig;
use crate::db::RepositoryError;

pub use adresse::AdresseClient;
pub use cache::CachedSource;
pub use known::{FuzzyKnownCities, KNOWN_CITIES, KnownCities, KnownCity};
pub use nominatim::NominatimClient;
pub use stored::StoredShops;

/// Errors a coordinate source can report.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("API error: status {0}")]
    Api(u16),

    /// Provider answered with an unexpected body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Store lookup failed.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),
}

/// Which strategy produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    KnownCity,
    StoredShops,
    Nominatim,
    AdresseApi,
    FuzzyMatch,
    NationalDefault,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::KnownCity => "known_city",
            Self::StoredShops => "stored_shops",
            Self::Nominatim => "nominatim",
            Self::AdresseApi => "adresse_api",
            Self::FuzzyMatch => "fuzzy_match",
            Self::NationalDefault => "national_default",
        };
        f.write_str(name)
    }
}

/// A strategy that may locate a city.
#[async_trait]
pub trait CoordinateSource: Send + Sync {
    /// The strategy reported when this source answers.
    fn source(&self) -> ResolutionSource;

    /// Locate a city. `Ok(None)` means "not known here, try the next source".
    async fn locate(&self, city: &CityName) -> Result<Option<Coordinates>, GeocodeError>;
}

/// The outcome of resolving a city name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    /// Resolved center and search radius.
    pub coordinates: Coordinates,
    /// Strategy that answered.
    pub source: ResolutionSource,
}

impl Resolution {
    /// The national-centroid fallback.
    #[must_use]
    pub const fn national_default() -> Self {
        Self {
            coordinates: Coordinates::NATIONAL_CENTER,
            source: ResolutionSource::NationalDefault,
        }
    }

    /// Whether no source could locate the city.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == ResolutionSource::NationalDefault
    }
}

/// Resolves city names through an ordered chain of sources.
#[derive(Clone)]
pub struct CoordinateResolver {
    sources: Arc<[Arc<dyn CoordinateSource>]>,
}

impl CoordinateResolver {
    /// Create a resolver over an explicit source chain.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn CoordinateSource>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }

    /// Build the standard chain: known cities, stored shops, Nominatim,
    /// address API, fuzzy known cities.
    ///
    /// # Errors
    ///
    /// Returns `GeocodeError::Http` if an HTTP client cannot be built.
    pub fn standard(pool: SqlitePool, providers: &ProviderConfig) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .timeout(providers.geocode_timeout)
            .user_agent(providers.user_agent.clone())
            .build()?;

        Ok(Self::with_geocoders(
            pool,
            NominatimClient::new(http.clone(), &providers.nominatim_url),
            AdresseClient::new(http, &providers.adresse_api_url),
        ))
    }

    /// Build the standard chain around the given geocoders, each behind a
    /// cache.
    #[must_use]
    pub fn with_geocoders<N, A>(pool: SqlitePool, nominatim: N, adresse: A) -> Self
    where
        N: CoordinateSource + 'static,
        A: CoordinateSource + 'static,
    {
        Self::new(vec![
            Arc::new(KnownCities),
            Arc::new(StoredShops::new(pool)),
            Arc::new(CachedSource::new(nominatim)),
            Arc::new(CachedSource::new(adresse)),
            Arc::new(FuzzyKnownCities),
        ])
    }

    /// Resolve a city name. Never fails.
    #[instrument(skip(self), fields(city = %city))]
    pub async fn resolve(&self, city: &CityName) -> Resolution {
        for source in self.sources.iter() {
            let kind = source.source();
            match source.locate(city).await {
                Ok(Some(coordinates)) if coordinates.is_valid() => {
                    debug!(
                        source = %kind,
                        lat = coordinates.lat,
                        lon = coordinates.lon,
                        "City resolved"
                    );
                    return Resolution {
                        coordinates,
                        source: kind,
                    };
                }
                Ok(Some(coordinates)) => {
                    warn!(
                        source = %kind,
                        lat = coordinates.lat,
                        lon = coordinates.lon,
                        "Source returned out-of-range coordinates"
                    );
                }
                Ok(None) => {
                    debug!(source = %kind, "Source has no match");
                }
                Err(e) => {
                    warn!(source = %kind, error = %e, "Coordinate source failed, trying next");
                }
            }
        }

        warn!("No source located city, using national default");
        Resolution::national_default()
    }
}
