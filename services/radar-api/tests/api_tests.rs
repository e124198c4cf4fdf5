//! End-to-end API tests: in-memory bucket, synthetic Level II chunks, real
//! decoder and renderer.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bytes::Bytes;
use level2_parser::Level2Decoder;
use metrics_exporter_prometheus::PrometheusBuilder;
use object_store::{memory::InMemory, path::Path, ObjectStore};
use radar_api::{build_router, config::ServiceConfig, state::AppState};
use radar_common::ColorConfig;
use serde_json::Value;
use storage::ChunkStore;
use tempfile::TempDir;
use test_utils::{chunk_key, scan_keys, temp_test_dir, Level2ArchiveBuilder};
use tower::ServiceExt;

const RAYS: usize = 36;
const GATES: usize = 20;

fn archive_builder() -> Level2ArchiveBuilder {
    Level2ArchiveBuilder::new("KTLX")
        .radials_per_record(18)
        .sweep(
            0.5,
            RAYS,
            GATES,
            &[
                ("REF", |_, gate| if gate == 0 { None } else { Some(35.0) }),
                ("VEL", |_, _| Some(-4.0)),
            ],
        )
        .sweep(1.5, RAYS, GATES, &[("REF", |_, _| Some(20.0))])
}

struct TestApp {
    router: Router,
    data_dir: TempDir,
}

impl TestApp {
    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn write_archive(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.data_dir.path().join(name), bytes).unwrap();
    }
}

/// App backed by a bucket holding one complete KTLX scan split into chunks.
async fn app_with_scan() -> TestApp {
    let memory = Arc::new(InMemory::new());
    let chunks = archive_builder().build_chunks();
    let keys = scan_keys("KTLX", 585, "20250129-150000", chunks.len() as u32 - 2);
    assert_eq!(keys.len(), chunks.len());
    for (key, chunk) in keys.iter().zip(chunks) {
        memory
            .put(&Path::from(key.as_str()), Bytes::from(chunk).into())
            .await
            .unwrap();
    }
    app_with_store(memory)
}

fn app_with_store(memory: Arc<InMemory>) -> TestApp {
    let data_dir = temp_test_dir();
    let config = ServiceConfig {
        data_dir: data_dir.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let state = AppState::with_parts(
        &config,
        Arc::new(ChunkStore::from_store(memory, "test")),
        Arc::new(Level2Decoder::new()),
        ColorConfig::default(),
    );
    let handle = PrometheusBuilder::new().build_recorder().handle();

    TestApp {
        router: build_router(Arc::new(state), handle),
        data_dir,
    }
}

// ============================================================================
// Acquisition
// ============================================================================

#[tokio::test]
async fn test_latest_scan_is_saved_then_reused() {
    let app = app_with_scan().await;

    let (status, body) = app.get("/get-latest-scan/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Radar scan data saved as KTLX_20250129-150000.bin"
    );
    assert!(app
        .data_dir
        .path()
        .join("KTLX_20250129-150000.bin")
        .is_file());

    let (status, body) = app.get("/get-latest-scan/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Radar scan data already exists as KTLX_20250129-150000.bin"
    );
}

#[tokio::test]
async fn test_empty_bucket_reports_error() {
    let app = app_with_store(Arc::new(InMemory::new()));
    let (status, body) = app.get("/get-latest-scan/KTLX").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("No files found for the latest scan"));
}

#[tokio::test]
async fn test_partial_latest_falls_back_to_previous() {
    let memory = Arc::new(InMemory::new());
    let chunks = archive_builder().build_chunks();
    let keys = scan_keys("KTLX", 584, "20250129-145000", chunks.len() as u32 - 2);
    for (key, chunk) in keys.iter().zip(chunks) {
        memory
            .put(&Path::from(key.as_str()), Bytes::from(chunk).into())
            .await
            .unwrap();
    }
    let partial = chunk_key("KTLX", 585, "20250129-150000", 1, 'S');
    memory
        .put(&Path::from(partial.as_str()), Bytes::from_static(b"AR2V").into())
        .await
        .unwrap();

    let app = app_with_store(memory);
    let (status, body) = app.get("/get-latest-scan/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Radar scan data saved as KTLX_20250129-145000.bin"
    );
}

#[tokio::test]
async fn test_invalid_radar_id() {
    let app = app_with_scan().await;
    let (status, body) = app.get("/get-latest-scan/KT..LX").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_dropdowns() {
    let app = app_with_scan().await;
    let (status, body) = app.get("/get-dropdowns/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["elevation_angles"], serde_json::json!([0.5, 1.5]));
    assert_eq!(
        body["radar_fields"],
        serde_json::json!(["reflectivity", "velocity"])
    );
}

#[tokio::test]
async fn test_elevations_and_fields_with_target_file() {
    let app = app_with_scan().await;
    app.write_archive("KTLX_20240101-000000.bin", &archive_builder().build());

    let (status, body) = app
        .get("/get-radar-elevations/KTLX?target_file=KTLX_20240101-000000.bin")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["elevation_angles"], serde_json::json!([0.5, 1.5]));

    let (status, body) = app
        .get("/get-radar-fields/KTLX?target_file=KTLX_20240101-000000.bin")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["radar_fields"],
        serde_json::json!(["reflectivity", "velocity"])
    );
}

#[tokio::test]
async fn test_target_file_is_confined_to_data_dir() {
    let app = app_with_scan().await;
    let (status, body) = app
        .get("/get-radar-elevations/KTLX?target_file=..%2Fsecret.bin")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app
        .get("/get-radar-fields/KTLX?target_file=missing.bin")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_corrupt_archive_is_unprocessable() {
    let app = app_with_scan().await;
    app.write_archive("KTLX_20240101-000000.bin", b"definitely not a radar archive");
    let (status, body) = app
        .get("/get-radar-fields/KTLX?target_file=KTLX_20240101-000000.bin")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

// ============================================================================
// Field overlays
// ============================================================================

#[tokio::test]
async fn test_field_requires_local_archive() {
    let app = app_with_scan().await;
    let (status, body) = app.get("/get/reflectivity/0.5/KTLX").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Radar file not found: No radar file found for KTLX");
}

#[tokio::test]
async fn test_field_features() {
    let app = app_with_scan().await;
    app.get("/get-latest-scan/KTLX").await;

    let (status, body) = app.get("/get/reflectivity/0.4/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");

    // Gate 0 is masked, so each of the RAYS-1 cell rows loses one cell.
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), (RAYS - 1) * (GATES - 2));

    let first = &features[0];
    assert_eq!(first["geometry"]["type"], "Polygon");
    assert_eq!(first["geometry"]["coordinates"][0].as_array().unwrap().len(), 5);
    assert_eq!(first["properties"]["value"], 35.0);
    let color = first["properties"]["color"].as_str().unwrap();
    assert!(color.starts_with('#') && color.len() == 7);
}

#[tokio::test]
async fn test_upper_tilt_selects_upper_sweep() {
    let app = app_with_scan().await;
    app.get("/get-latest-scan/KTLX").await;

    let (status, body) = app.get("/get/reflectivity/10/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), (RAYS - 1) * (GATES - 1));
    assert_eq!(features[0]["properties"]["value"], 20.0);
}

#[tokio::test]
async fn test_missing_field_and_bad_tilt() {
    let app = app_with_scan().await;
    app.get("/get-latest-scan/KTLX").await;

    let (status, body) = app.get("/get/spectrum_width/1.5/KTLX").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("spectrum_width"));

    // Velocity exists in the volume, so the upper sweep falls back to the
    // grid instead of failing. The low velocity sweep never reaches 2 km.
    let (status, body) = app.get("/get/velocity/1.5/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"], serde_json::json!([]));

    let (status, _) = app.get("/get/reflectivity/abc/KTLX").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fully_masked_field_uses_grid_fallback() {
    let app = app_with_store(Arc::new(InMemory::new()));
    let bytes = Level2ArchiveBuilder::new("KFWS")
        .sweep(0.5, RAYS, GATES, &[("REF", |_, _| None)])
        .build();
    app.write_archive("KFWS_20250129-150000.bin", &bytes);

    let (status, body) = app.get("/get/reflectivity/0.5/KFWS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"], serde_json::json!([]));

    let (status, body) = app.get("/get-grid/reflectivity/0.5/KFWS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gridded"], true);
    assert_eq!(body["shape"], serde_json::json!([500, 500]));
    let values = body["values"].as_array().unwrap();
    assert_eq!(values.len(), 500 * 500);
    assert!(values.iter().all(Value::is_null));
    assert!(body["latitude"][0].is_number());
}

#[tokio::test]
async fn test_split_cut_velocity_uses_volume_grid() {
    let app = app_with_store(Arc::new(InMemory::new()));
    let bytes = Level2ArchiveBuilder::new("KTLX")
        .sweep(0.5, RAYS, 60, &[("REF", |_, _| Some(30.0))])
        .sweep(0.5, RAYS, 60, &[("VEL", |_, _| Some(-3.0))])
        .sweep(10.0, RAYS, 60, &[("VEL", |_, _| Some(-3.0))])
        .build();
    app.write_archive("KTLX_20250129-150000.bin", &bytes);

    let (status, body) = app.get("/get/velocity/0.5/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    let features = body["features"].as_array().unwrap();
    assert!(!features.is_empty());
    assert!(features
        .iter()
        .all(|f| f["geometry"]["type"] == "Point" && f["properties"]["value"] == -3.0));

    let (status, body) = app.get("/get-grid/velocity/0.5/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gridded"], true);
    assert!(body["values"].as_array().unwrap().iter().any(|v| *v == -3.0));

    // Reflectivity on the surveillance cut still renders as polar cells.
    let (status, body) = app.get("/get/reflectivity/0.5/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"].as_array().unwrap().len(), (RAYS - 1) * 59);
}

#[tokio::test]
async fn test_grid_nulls_masked_gates() {
    let app = app_with_scan().await;
    app.get("/get-latest-scan/KTLX").await;

    let (status, body) = app.get("/get-grid/reflectivity/0.5/KTLX").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gridded"], false);
    assert_eq!(body["shape"], serde_json::json!([RAYS, GATES]));
    assert!(body["values"][0].is_null());
    assert_eq!(body["values"][1], 35.0);
}

// ============================================================================
// Health and metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = app_with_store(Arc::new(InMemory::new()));
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "radar-api");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app_with_store(Arc::new(InMemory::new()));
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
