//! Nominatim (OpenStreetMap) geocoding client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use rescue_map_core::{CityName, Coordinates};

use super::{CoordinateSource, GeocodeError, ResolutionSource};

/// One search hit. Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Nominatim `/search` client, restricted to France.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// Create a client against a Nominatim base URL.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, city: &CityName) -> Result<Url, GeocodeError> {
        let query = format!("{city}, France");
        let url = Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("q", query.as_str()), ("format", "json"), ("limit", "1")],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl CoordinateSource for NominatimClient {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Nominatim
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
        debug!(found = located.is_some(), "Nominatim answered");
        Ok(located)
    }
}

/// Parse a `/search?format=json` body into the first hit's coordinates.
fn parse_search_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };

    let lat = hit
        .lat
        .parse::<f64>()
        .map_err(|e| GeocodeError::Parse(format!("lat {:?}: {e}", hit.lat)))?;
    let lon = hit
        .lon
        .parse::<f64>()
        .map_err(|e| GeocodeError::Parse(format!("lon {:?}: {e}", hit.lon)))?;

    Ok(Some(Coordinates::with_default_radius(lat, lon)))
}
