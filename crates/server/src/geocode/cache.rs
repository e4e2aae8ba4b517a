//! Caching wrapper for remote coordinate sources.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use rescue_map_core::{CityName, Coordinates};

use super::{CoordinateSource, GeocodeError, ResolutionSource};

/// Caches successful lookups of an inner source by lowercase city name.
///
/// Misses and errors are not cached, so a city unknown to a provider is
/// asked again next time.
pub struct CachedSource<S> {
    inner: S,
    cache: Cache<String, Coordinates>,
}

impl<S: CoordinateSource> CachedSource<S> {
    /// Wrap a source with a 1-hour cache.
    #[must_use]
    pub fn new(inner: S) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(3600)) // 1 hour
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl<S: CoordinateSource> CoordinateSource for CachedSource<S> {
    fn source(&self) -> ResolutionSource {
        self.inner.source()
    }

    async fn locate(&self, city: &CityName) -> Result<Option<Coordinates>, GeocodeError> {
        let key = city.key();
        if let Some(coordinates) = self.cache.get(&key).await {
            debug!(source = %self.inner.source(), city = %city, "Cache hit for coordinates");
            return Ok(Some(coordinates));
        }

        let located = self.inner.locate(city).await?;
        if let Some(coordinates) = located {
            self.cache.insert(key, coordinates).await;
        }
        Ok(located)
    }
}
