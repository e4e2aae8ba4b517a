//! Overpass API client for shop points of interest.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use rescue_map_core::{CityName, Coordinates, ShopCandidate};

use super::PoiSource;
use crate::config::ProviderConfig;

/// Errors that can occur when querying Overpass.
#[derive(Debug, Error)]
pub enum OverpassError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Overpass answered with a non-success status.
    #[error("API error: status {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Tag filters queried around a city center, with their radius factor.
const CATEGORIES: &[(&str, &str, f64)] = &[
    ("shop", "supermarket", 1.0),
    ("shop", "mall", 1.0),
    ("shop", "hypermarket", 1.0),
    ("shop", "convenience", 0.7),
    ("amenity", "marketplace", 0.5),
];

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: Tags,
}

#[derive(Debug, Default, Deserialize)]
struct Tags {
    name: Option<String>,
    shop: Option<String>,
    amenity: Option<String>,
}

/// Overpass interpreter client.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OverpassClient {
    /// Create a client against an interpreter endpoint.
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// Create a client from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `OverpassError::Http` if the HTTP client fails to build.
    pub fn from_config(providers: &ProviderConfig) -> Result<Self, OverpassError> {
        let client = reqwest::Client::builder()
            .timeout(providers.overpass_timeout)
            .user_agent(providers.user_agent.clone())
            .build()?;

        Ok(Self::new(client, &providers.overpass_url))
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    #[instrument(skip(self), fields(city = %city))]
    async fn find(
        &self,
        city: &CityName,
        center: &Coordinates,
    ) -> Result<Vec<ShopCandidate>, OverpassError> {
        let query = build_query(center);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OverpassError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let candidates = parse_response(&body, city)?;
        debug!(count = candidates.len(), "Overpass answered");
        Ok(candidates)
    }
}

/// Build the radius-bounded query for every category around `center`.
fn build_query(center: &Coordinates) -> String {
    let radius = center.radius_meters();
    let mut query = String::from("[out:json][timeout:25];\n(\n");

    for (key, value, factor) in CATEGORIES {
        let _ = writeln!(
            query,
            "  node[\"{key}\"=\"{value}\"](around:{:.0},{},{});",
            radius * factor,
            center.lat,
            center.lon
        );
    }

    query.push_str(");\nout center;\n");
    query
}

/// Decode an Overpass body into candidates, dropping elements without a position.
fn parse_response(body: &str, city: &CityName) -> Result<Vec<ShopCandidate>, OverpassError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| OverpassError::Parse(e.to_string()))?;

    Ok(response
        .elements
        .into_iter()
        .filter_map(|element| into_candidate(element, city))
        .collect())
}

fn into_candidate(element: Element, city: &CityName) -> Option<ShopCandidate> {
    let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
        debug!(element = element.id, "Dropping element without coordinates");
        return None;
    };

    let Tags {
        name,
        shop,
        amenity,
    } = element.tags;

    Some(ShopCandidate {
        name: name.unwrap_or_else(|| format!("Magasin {city}")),
        lat,
        lon,
        kind: shop.or(amenity).unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_scales_radius_per_category() {
        let query = build_query(&Coordinates::new(43.6045, 1.444, 20.0));
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains(r#"node["shop"="supermarket"](around:20000,43.6045,1.444);"#));
        assert!(query.contains(r#"node["shop"="mall"](around:20000,43.6045,1.444);"#));
        assert!(query.contains(r#"node["shop"="hypermarket"](around:20000,43.6045,1.444);"#));
        assert!(query.contains(r#"node["shop"="convenience"](around:14000,43.6045,1.444);"#));
        assert!(query.contains(r#"node["amenity"="marketplace"](around:10000,43.6045,1.444);"#));
        assert!(query.trim_end().ends_with("out center;"));
    }

    #[test]
    fn test_parse_maps_tags_and_drops_positionless_elements() {
        let body = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 43.60, "lon": 1.44,
                 "tags": {"name": "Carrefour Market", "shop": "supermarket"}},
                {"type": "node", "id": 2, "lat": 43.61, "lon": 1.45,
                 "tags": {"amenity": "marketplace"}},
                {"type": "node", "id": 3, "lat": 43.62, "lon": 1.46},
                {"type": "way", "id": 4, "center": {"lat": 43.63, "lon": 1.47},
                 "tags": {"name": "Leclerc", "shop": "hypermarket"}},
                {"type": "node", "id": 5, "lat": 43.64,
                 "tags": {"name": "Spar", "shop": "convenience"}}
            ]
        }"#;
        let city = CityName::parse("Toulouse").unwrap();
        let candidates = parse_response(body, &city).unwrap();

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "Carrefour Market");
        assert_eq!(candidates[0].kind, "supermarket");
        assert_eq!(candidates[1].name, "Magasin Toulouse");
        assert_eq!(candidates[1].kind, "marketplace");
        assert_eq!(candidates[2].kind, "unknown");
    }

    #[test]
    fn test_parse_empty_and_invalid_bodies() {
        let city = CityName::parse("Toulouse").unwrap();
        assert!(parse_response(r#"{"elements": []}"#, &city).unwrap().is_empty());
        assert!(matches!(
            parse_response("runtime error: query timed out", &city),
            Err(OverpassError::Parse(_))
        ));
    }
}
