//! HTTP handlers.
//!
//! Every endpoint answers JSON. Failures are `{"error": "..."}` with the
//! status code of the underlying [`RadarError`].

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use radar_common::RadarError;
use renderer::FeatureCollection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::metrics::record_request;
use crate::pipeline::FieldGrid;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ElevationsResponse {
    pub elevation_angles: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldsResponse {
    pub radar_fields: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DropdownsResponse {
    pub elevation_angles: Vec<f64>,
    pub radar_fields: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TargetQuery {
    pub target_file: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// A [`RadarError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RadarError);

impl From<RadarError> for ApiError {
    fn from(e: RadarError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(error = %self.0, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn finish<T>(endpoint: &'static str, result: Result<T, RadarError>) -> ApiResult<T> {
    record_request(endpoint, result.is_ok());
    result.map(Json).map_err(ApiError)
}

fn parse_tilt(tilt: &str) -> Result<f64, RadarError> {
    tilt.parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| RadarError::invalid_argument(format!("invalid tilt: {}", tilt)))
}

// ============================================================================
// Scan acquisition and metadata
// ============================================================================

/// GET /get-latest-scan/:radar_id - Assemble the newest usable scan
#[instrument(skip(state))]
pub async fn latest_scan_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(radar_id): Path<String>,
) -> ApiResult<MessageResponse> {
    info!(radar_id = %radar_id, "Latest scan request");

    let result = state
        .scans
        .acquire_latest(&radar_id)
        .await
        .map(|scan| MessageResponse {
            message: scan.message(),
        });
    finish("get-latest-scan", result)
}

/// GET /get-radar-elevations/:radar_id - Sweep elevation angles
#[instrument(skip(state))]
pub async fn elevations_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(radar_id): Path<String>,
    Query(query): Query<TargetQuery>,
) -> ApiResult<ElevationsResponse> {
    let result = async {
        let path = state
            .scans
            .resolve_archive(&radar_id, query.target_file.as_deref())
            .await?;
        let elevation_angles = state.scans.elevations(&path).await?;
        Ok::<_, RadarError>(ElevationsResponse { elevation_angles })
    }
    .await;
    finish("get-radar-elevations", result)
}

/// GET /get-radar-fields/:radar_id - Available field names
#[instrument(skip(state))]
pub async fn fields_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(radar_id): Path<String>,
    Query(query): Query<TargetQuery>,
) -> ApiResult<FieldsResponse> {
    let result = async {
        let path = state
            .scans
            .resolve_archive(&radar_id, query.target_file.as_deref())
            .await?;
        let radar_fields = state.scans.fields(&path).await?;
        Ok::<_, RadarError>(FieldsResponse { radar_fields })
    }
    .await;
    finish("get-radar-fields", result)
}

/// GET /get-dropdowns/:radar_id - Elevations and fields of the latest scan
#[instrument(skip(state))]
pub async fn dropdowns_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(radar_id): Path<String>,
) -> ApiResult<DropdownsResponse> {
    let result = async {
        let path = state.scans.resolve_archive(&radar_id, None).await?;
        let (elevation_angles, radar_fields) = state.scans.dropdowns(&path).await?;
        Ok::<_, RadarError>(DropdownsResponse {
            elevation_angles,
            radar_fields,
        })
    }
    .await;
    finish("get-dropdowns", result)
}

// ============================================================================
// Field overlays
// ============================================================================

/// GET /get/:field/:tilt/:radar_id - Colorized GeoJSON features
#[instrument(skip(state))]
pub async fn field_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((field, tilt, radar_id)): Path<(String, String, String)>,
) -> ApiResult<FeatureCollection> {
    let result = async {
        let tilt = parse_tilt(&tilt)?;
        let output = state.scans.render_field(&radar_id, &field, tilt).await?;
        info!(
            features = output.features.len(),
            sweep = output.sweep,
            gridded = output.gridded,
            "Rendered field"
        );
        Ok::<_, RadarError>(FeatureCollection::from(output.features))
    }
    .await;
    finish("get", result)
}

/// GET /get-grid/:field/:tilt/:radar_id - Raw sample arrays
#[instrument(skip(state))]
pub async fn grid_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((field, tilt, radar_id)): Path<(String, String, String)>,
) -> ApiResult<FieldGrid> {
    let result = async {
        let tilt = parse_tilt(&tilt)?;
        state.scans.field_grid(&radar_id, &field, tilt).await
    }
    .await;
    finish("get-grid", result)
}

// ============================================================================
// Health and metrics
// ============================================================================

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "radar-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}
