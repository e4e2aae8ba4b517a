//! Coordinates of shops already stored for a city.

use async_trait::async_trait;
use sqlx::SqlitePool;

use rescue_map_core::{CityName, Coordinates};

use super::{CoordinateSource, GeocodeError, ResolutionSource};
use crate::db::ShopRepository;

/// Locates a city by its first stored shop, with the default radius.
#[derive(Debug, Clone)]
pub struct StoredShops {
    pool: SqlitePool,
}

impl StoredShops {
    /// Create a source reading from the given store.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoordinateSource for StoredShops {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::StoredShops
    }

    async fn locate(&self, city: &CityName) -> Result<Option<Coordinates>, GeocodeError> {
        let location = ShopRepository::new(&self.pool).first_location(city).await?;
        Ok(location.map(|(lat, lon)| Coordinates::with_default_radius(lat, lon)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rescue_map_core::ShopCandidate;

    use super::*;
    use crate::db::memory_store;

    #[tokio::test]
    async fn test_locates_city_from_stored_shop() {
        let pool = memory_store().await.unwrap();
        let rennes = CityName::parse("Rennes").unwrap();
        let source = StoredShops::new(pool.clone());

        assert_eq!(source.locate(&rennes).await.unwrap(), None);

        let candidate = ShopCandidate {
            name: "Carrefour City".to_string(),
            lat: 48.11,
            lon: -1.68,
            kind: "convenience".to_string(),
        };
        ShopRepository::new(&pool)
            .insert_inventory(&rennes, &[candidate], Utc::now())
            .await
            .unwrap();

        let found = source.locate(&rennes).await.unwrap().unwrap();
        assert_eq!(found, Coordinates::with_default_radius(48.11, -1.68));
    }
}
