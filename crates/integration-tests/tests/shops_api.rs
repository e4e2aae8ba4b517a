//! Shop API: population, listing, status reports and resets.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rescue_map_integration_tests::{FixedPois, TestContext};
use serde_json::{Value, json};
use tower::ServiceExt;

fn ids(shops: &Value) -> Vec<i64> {
    shops
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::with_shops(&["Lidl"]).await;

    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let (status, _) = ctx.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_supermarkets_defaults_to_toulouse_and_populates_once() {
    let ctx = TestContext::with_shops(&["Super U", "Auchan", "Casino"]).await;

    let (status, shops) = ctx.get("/api/supermarkets").await;
    assert_eq!(status, StatusCode::OK);
    let shops = shops.as_array().unwrap().clone();
    assert_eq!(shops.len(), 3);
    assert_eq!(shops[0]["name"], "Auchan");
    assert_eq!(shops[0]["city"], "Toulouse");
    assert_eq!(shops[0]["status"], "unknown");
    assert_eq!(shops[0]["type"], "supermarket");
    assert!(shops[0]["last_verified"].is_string());

    let (_, again) = ctx.get("/api/supermarkets?city=toulouse").await;
    assert_eq!(again.as_array().unwrap().len(), 3);
    assert_eq!(ctx.poi_calls(), 1);
}

#[tokio::test]
async fn test_load_city_reports_center_and_is_idempotent() {
    let ctx = TestContext::with_shops(&["Carrefour", "Leclerc"]).await;

    let (status, first) = ctx.get("/api/load_city?city=Toulouse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["count"], 2);
    assert_eq!(first["inserted"], 2);
    assert_eq!(first["lat"], 43.6045);
    assert_eq!(first["lon"], 1.4440);
    assert_eq!(first["radius"], 20.0);
    assert_eq!(first["located_by"], "known_city");
    assert_eq!(first["inventory_source"], "overpass");

    let (_, second) = ctx.get("/api/load_city?city=TOULOUSE").await;
    assert_eq!(second["count"], 2);
    assert_eq!(second["inserted"], 0);
    assert!(second.get("inventory_source").is_none());
}

#[tokio::test]
async fn test_unknown_city_is_located_by_its_stored_shops() {
    let ctx = TestContext::with_pois(FixedPois::unavailable()).await;

    let (_, first) = ctx.get("/api/load_city?city=Albi").await;
    assert_eq!(first["located_by"], "national_default");
    assert_eq!(first["inventory_source"], "synthetic");
    let count = first["count"].as_i64().unwrap();
    assert!((15..=35).contains(&count));

    let (_, second) = ctx.get("/api/load_city?city=albi").await;
    assert_eq!(second["located_by"], "stored_shops");
    assert_eq!(second["count"], count);
}

#[tokio::test]
async fn test_update_status_round_trip() {
    let ctx = TestContext::with_shops(&["Monoprix", "Franprix"]).await;
    let (_, shops) = ctx.get("/api/supermarkets?city=Paris").await;
    let id = ids(&shops)[0];

    let (status, body) = ctx
        .post(
            "/api/update_status",
            &json!({"id": id, "status": "danger", "city": "paris", "notes": "file d'attente"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, shops) = ctx.get("/api/supermarkets?city=PARIS").await;
    let shop = shops
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == id)
        .unwrap();
    assert_eq!(shop["status"], "danger");
    assert_eq!(shop["notes"], "file d'attente");
    assert!(shop["last_verified"].is_string());
}

#[tokio::test]
async fn test_update_status_rejects_bad_requests() {
    let ctx = TestContext::with_shops(&["Spar"]).await;
    let (_, shops) = ctx.get("/api/supermarkets?city=Nice").await;
    let id = ids(&shops)[0];

    let (status, body) = ctx
        .post(
            "/api/update_status",
            &json!({"id": id, "status": "on fire", "city": "Nice"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = ctx
        .post(
            "/api/update_status",
            &json!({"id": id, "status": "safe", "city": "Lyon"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, _) = ctx
        .post("/api/update_status", &json!({"status": "safe"}))
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_reset_city_replaces_ids() {
    let ctx = TestContext::with_shops(&["A", "B", "C"]).await;
    let (_, before) = ctx.get("/api/supermarkets?city=Lille").await;
    let before = ids(&before);

    let (status, reset) = ctx.get("/api/reset_city?city=lille").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["success"], true);
    assert_eq!(reset["count"], 3);
    assert_eq!(reset["deleted"], 3);

    let (_, after) = ctx.get("/api/supermarkets?city=Lille").await;
    let after = ids(&after);
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|id| !before.contains(id)));
}

#[tokio::test]
async fn test_blank_city_is_rejected() {
    let ctx = TestContext::with_shops(&["A"]).await;
    let (status, body) = ctx.get("/api/supermarkets?city=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_status_counts_cities() {
    let ctx = TestContext::with_shops(&["A", "B"]).await;
    ctx.get("/api/load_city?city=Lyon").await;
    ctx.get("/api/load_city?city=Bordeaux").await;

    let (status, body) = ctx.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert_eq!(body["cities"], json!({"Bordeaux": 2, "Lyon": 2}));
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let ctx = TestContext::with_shops(&["A"]).await;
    let response = ctx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}
