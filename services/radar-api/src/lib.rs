//! Radar scan API service library.
//!
//! Exposes the router and its building blocks so integration tests can drive
//! the service without binding a socket.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod state;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>, prometheus: PrometheusHandle) -> Router {
    Router::new()
        // Scan acquisition and metadata
        .route("/get-latest-scan/:radar_id", get(handlers::latest_scan_handler))
        .route("/get-radar-elevations/:radar_id", get(handlers::elevations_handler))
        .route("/get-radar-fields/:radar_id", get(handlers::fields_handler))
        .route("/get-dropdowns/:radar_id", get(handlers::dropdowns_handler))
        // Field overlays
        .route("/get/:field/:tilt/:radar_id", get(handlers::field_handler))
        .route("/get-grid/:field/:tilt/:radar_id", get(handlers::grid_handler))
        // Health and metrics
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(Extension(prometheus))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
