//! French government address API (`api-adresse.data.gouv.fr`) client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use rescue_map_core::{CityName, Coordinates};

use super::{CoordinateSource, GeocodeError, ResolutionSource};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

/// GeoJSON point: `[lon, lat]`.
#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Municipality search against the address API.
#[derive(Debug, Clone)]
pub struct AdresseClient {
    client: reqwest::Client,
    base_url: String,
}

impl AdresseClient {
    /// Create a client against an address API base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, city: &CityName) -> Result<Url, GeocodeError> {
        let url = Url::parse_with_params(
            &format!("{}/search/", self.base_url),
            &[("q", city.as_str()), ("type", "municipality"), ("limit", "1")],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl CoordinateSource for AdresseClient {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::AdresseApi
    }

    #[instrument(skip(self), fields(city = %city))]
    async fn locate(&self, city: &CityName) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self.client.get(self.search_url(city)?).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(GeocodeError::Api(status.as_u16()));
        }

        let body = response.text().await?;
        let located = parse_search_response(&body)?;
        debug!(found = located.is_some(), "Address API answered");
        Ok(located)
    }
}

fn parse_search_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    let Some(feature) = collection.features.into_iter().next() else {
        return Ok(None);
    };

    match feature.geometry.coordinates.as_slice() {
        [lon, lat, ..] => Ok(Some(Coordinates::with_default_radius(*lat, *lon))),
        other => Err(GeocodeError::Parse(format!(
            "expected [lon, lat], got {} values",
            other.len()
        ))),
    }
}
