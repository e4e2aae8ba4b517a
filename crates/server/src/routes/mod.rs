//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database)
//!
//! # Shops
//! GET  /api/supermarkets?city=  - Shops of a city (populated on first touch)
//! GET  /api/load_city?city=     - Populate a city, report its center and count
//! GET  /api/reset_city?city=    - Replace a city's shops with a fresh fetch
//! POST /api/update_status       - Report a shop's status
//! GET  /api/status              - Node status and shop counts per city
//!
//! # Sync
//! GET  /api/sync/export?since=  - Rows verified after `since`
//! POST /api/sync/import         - Apply a change set
//! ```

pub mod health;
pub mod shops;
pub mod sync;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/supermarkets", get(shops::list))
        .route("/load_city", get(shops::load_city))
        .route("/reset_city", get(shops::reset_city))
        .route("/update_status", post(shops::update_status))
        .route("/status", get(shops::status))
}

/// Create the sync routes router.
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/export", get(sync::export))
        .route("/import", post(sync::import))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", shop_routes())
        .nest("/api/sync", sync_routes())
}
