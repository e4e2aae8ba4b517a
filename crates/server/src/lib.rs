//! RescueMap server library.
//!
//! Crowd-sourced status map of food shops per French city: cities are
//! populated on first touch from OpenStreetMap (or a synthetic stand-in),
//! users report each shop as safe, in danger or looted, and independent
//! nodes exchange reports through timestamped change sets.
//!
//! The binary (`rescue-map-server`) and the CLI are thin shells around this
//! crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod inventory;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod sync;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use state::AppState;

/// Build the application router with tracing and request IDs.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = Empty,
                )
            }),
        )
        .with_state(state)
}
