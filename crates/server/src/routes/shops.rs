//! Shop route handlers.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rescue_map_core::{CityName, Shop, ShopId, ShopStatus, timestamp};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::fetch::InventorySource;
use crate::geocode::ResolutionSource;
use crate::state::AppState;

/// City used when a request does not name one.
pub const DEFAULT_CITY: &str = "Toulouse";

/// `?city=` query parameter.
#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

impl CityQuery {
    fn city(&self) -> Result<CityName> {
        CityName::parse(self.city.as_deref().unwrap_or(DEFAULT_CITY))
            .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

/// Response of `GET /api/load_city`.
#[derive(Debug, Serialize)]
pub struct LoadCityResponse {
    pub success: bool,
    pub city: String,
    pub count: i64,
    pub inserted: u64,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub located_by: ResolutionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_source: Option<InventorySource>,
}

/// Response of `GET /api/reset_city`.
#[derive(Debug, Serialize)]
pub struct ResetCityResponse {
    pub success: bool,
    pub city: String,
    pub count: u64,
    pub deleted: u64,
    pub inventory_source: InventorySource,
}

/// Body of `POST /api/update_status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub id: i64,
    pub status: String,
    pub city: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Plain `{"success": true}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

/// Response of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub cities: BTreeMap<String, i64>,
    pub timestamp: String,
}

/// List the shops of a city, populating it on first touch.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<Vec<Shop>>> {
    let city = query.city()?;
    state.inventory().ensure_populated(&city).await?;
    let shops = state.inventory().list(&city).await?;
    Ok(Json(shops))
}

/// Populate a city and report where it was located.
#[instrument(skip(state))]
pub async fn load_city(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<LoadCityResponse>> {
    let city = query.city()?;
    let load = state.inventory().ensure_populated(&city).await?;
    let coordinates = load.resolution.coordinates;

    Ok(Json(LoadCityResponse {
        success: true,
        city: load.city,
        count: load.count,
        inserted: load.inserted,
        lat: coordinates.lat,
        lon: coordinates.lon,
        radius: coordinates.radius,
        located_by: load.resolution.source,
        inventory_source: load.source,
    }))
}

/// Discard a city's shops and fetch them again.
#[instrument(skip(state))]
pub async fn reset_city(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<ResetCityResponse>> {
    let city = query.city()?;
    let reset = state.inventory().reset(&city).await?;

    Ok(Json(ResetCityResponse {
        success: true,
        city: reset.city,
        count: reset.inserted,
        deleted: reset.deleted,
        inventory_source: reset.source,
    }))
}

/// Record a status report.
#[instrument(skip(state, request), fields(id = request.id, city = %request.city))]
pub async fn update_status(
    State(state): State<AppState>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Ack>> {
    let status: ShopStatus = request.status.parse().map_err(AppError::BadRequest)?;
    let city = CityName::parse(&request.city).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let id = ShopId::new(request.id);

    state
        .inventory()
        .update_status(id, &city, status, request.notes.as_deref())
        .await?;

    add_breadcrumb(
        "status",
        "Shop status reported",
        Some(&[("city", city.as_str()), ("status", status.as_str())]),
    );

    Ok(Json(Ack { success: true }))
}

/// Node status with shop counts per city.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    let cities = state.inventory().city_counts().await?.into_iter().collect();

    Ok(Json(StatusResponse {
        status: "online",
        cities,
        timestamp: timestamp::format(Utc::now()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_query_defaults_to_toulouse() {
        let query = CityQuery { city: None };
        assert_eq!(query.city().ok().map(|c| c.to_string()).as_deref(), Some("Toulouse"));
    }

    #[test]
    fn test_city_query_rejects_blank_city() {
        let query = CityQuery {
            city: Some("   ".to_string()),
        };
        assert!(matches!(query.city(), Err(AppError::BadRequest(_))));
    }
}
