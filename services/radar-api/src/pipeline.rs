//! Scan acquisition and rendering pipeline behind the HTTP handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use radar_common::volume::is_usable;
use radar_common::{
    sanitize, ColorConfig, FieldStyle, RadarError, RadarResult, Sweep, Volume, VolumeDecoder,
};
use renderer::{
    elevation_angles, gridify, render_grid, render_polar, select_sweep, GridParams,
    RenderedFeature,
};
use serde::Serialize;
use storage::{list_groups, select_scan, ArchiveStore, ChunkSource, RadarArchive, ScanAssembler};
use tokio::task;
use tracing::{info, instrument, warn};

use crate::metrics;

/// A scan made available locally.
#[derive(Debug, Clone)]
pub struct AcquiredScan {
    pub archive: RadarArchive,
    /// `false` when the archive was already present
    pub created: bool,
}

impl AcquiredScan {
    /// User-facing status line.
    pub fn message(&self) -> String {
        if self.created {
            format!("Radar scan data saved as {}", self.archive.file_name())
        } else {
            format!("Radar scan data already exists as {}", self.archive.file_name())
        }
    }
}

/// Rendered features of one field and sweep.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub features: Vec<RenderedFeature>,
    /// Index of the rendered sweep
    pub sweep: usize,
    /// `true` when the cartesian fallback grid was used
    pub gridded: bool,
}

/// Raw sample arrays of one field, non-finite values as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldGrid {
    pub field: String,
    pub elevation_angle: f64,
    /// `[rows, cols]`
    pub shape: [usize; 2],
    pub latitude: Vec<Option<f64>>,
    pub longitude: Vec<Option<f64>>,
    pub values: Vec<Option<f64>>,
    pub gridded: bool,
}

/// Orchestrates inventory, selection, assembly, decoding and rendering.
pub struct ScanService {
    source: Arc<dyn ChunkSource>,
    archives: ArchiveStore,
    assembler: ScanAssembler,
    decoder: Arc<dyn VolumeDecoder>,
    colors: ColorConfig,
    grid: GridParams,
}

impl ScanService {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        decoder: Arc<dyn VolumeDecoder>,
        archives: ArchiveStore,
        colors: ColorConfig,
        max_concurrent_downloads: usize,
    ) -> Self {
        let assembler = ScanAssembler::new(source.clone(), max_concurrent_downloads);
        Self {
            source,
            archives,
            assembler,
            decoder,
            colors,
            grid: GridParams::default(),
        }
    }

    pub fn archives(&self) -> &ArchiveStore {
        &self.archives
    }

    /// Make the best available recent scan of `station` available locally.
    #[instrument(skip(self))]
    pub async fn acquire_latest(&self, station: &str) -> RadarResult<AcquiredScan> {
        validate_station(station)?;

        let inventory = list_groups(self.source.as_ref(), station).await?;
        let choice = select_scan(
            inventory.latest.as_ref(),
            inventory.previous.as_ref(),
            |s, ts| self.archives.exists(s, ts),
        )
        .ok_or_else(|| RadarError::NoScans(station.to_string()))?;

        info!(
            timestamp = %choice.group.timestamp,
            chunks = choice.group.len(),
            reason = ?choice.reason,
            "Selected scan"
        );

        let outcome = self
            .archives
            .assemble_scan(&choice.group, &self.assembler)
            .await?;

        Ok(AcquiredScan {
            archive: outcome.archive,
            created: outcome.created,
        })
    }

    /// The archive named by `target_file`, or the latest scan (acquired on
    /// demand).
    pub async fn resolve_archive(&self, station: &str, target_file: Option<&str>) -> RadarResult<PathBuf> {
        match target_file.filter(|t| !t.is_empty()) {
            Some(name) => self.archives.resolve_target(name),
            None => Ok(self.acquire_latest(station).await?.archive.path),
        }
    }

    /// Decode an archive on the blocking pool.
    #[instrument(skip(self))]
    pub async fn load_volume(&self, path: &Path) -> RadarResult<Volume> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RadarError::NotFound(path.display().to_string()),
            _ => RadarError::from(e),
        })?;

        let decoder = self.decoder.clone();
        let volume = task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| RadarError::Internal(format!("decode task failed: {}", e)))??;
        Ok(volume)
    }

    /// Rounded, deduplicated sweep angles of an archive.
    pub async fn elevations(&self, path: &Path) -> RadarResult<Vec<f64>> {
        let volume = self.load_volume(path).await?;
        Ok(elevation_angles(&volume.sweep_angles()))
    }

    /// Sorted field names of an archive.
    pub async fn fields(&self, path: &Path) -> RadarResult<Vec<String>> {
        let volume = self.load_volume(path).await?;
        Ok(volume.field_names())
    }

    /// Elevations and fields of one archive, decoded once.
    pub async fn dropdowns(&self, path: &Path) -> RadarResult<(Vec<f64>, Vec<String>)> {
        let volume = self.load_volume(path).await?;
        Ok((elevation_angles(&volume.sweep_angles()), volume.field_names()))
    }

    async fn latest_local_volume(&self, station: &str) -> RadarResult<Volume> {
        validate_station(station)?;
        let archive = self
            .archives
            .latest_local(station)
            .await?
            .ok_or_else(|| RadarError::NotFound(format!("No radar file found for {}", station)))?;
        self.load_volume(&archive.path).await
    }

    /// Render `field` at the sweep nearest `tilt` from the newest local
    /// archive of `station`.
    #[instrument(skip(self))]
    pub async fn render_field(&self, station: &str, field: &str, tilt: f64) -> RadarResult<RenderOutput> {
        let volume = self.latest_local_volume(station).await?;
        let style = self.colors.style_for(field);
        let grid = self.grid;
        let field = field.to_string();

        let started = Instant::now();
        let output = task::spawn_blocking(move || render_volume(&volume, &field, tilt, &style, &grid))
            .await
            .map_err(|e| RadarError::Internal(format!("render task failed: {}", e)))??;

        metrics::record_render(
            started.elapsed().as_secs_f64() * 1000.0,
            output.features.len(),
            output.gridded,
        );
        Ok(output)
    }

    /// Raw sample arrays for `field` at the sweep nearest `tilt`.
    pub async fn field_grid(&self, station: &str, field: &str, tilt: f64) -> RadarResult<FieldGrid> {
        let volume = self.latest_local_volume(station).await?;
        let grid = self.grid;
        let field = field.to_string();

        task::spawn_blocking(move || raw_field_grid(&volume, &field, tilt, &grid))
            .await
            .map_err(|e| RadarError::Internal(format!("grid task failed: {}", e)))?
    }
}

/// Station identifiers are short ICAO codes; anything else could escape the
/// archive naming scheme.
fn validate_station(station: &str) -> RadarResult<()> {
    if station.is_empty() || station.len() > 8 || !station.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RadarError::invalid_argument(format!(
            "invalid radar id: {:?}",
            station
        )));
    }
    Ok(())
}

/// Whether the selected sweep has samples for `field` at all.
///
/// A field the volume carries but this sweep lacks counts as fully masked.
/// Unmasked samples count even when they hold no usable value.
fn has_unmasked_samples(volume: &Volume, sweep: &Sweep, field: &str) -> RadarResult<bool> {
    match sweep.field(field) {
        Ok(data) => Ok(data.unmasked_count() > 0),
        Err(_) if volume.has_field(field) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Select the sweep and render it, falling back to the cartesian grid of
/// the whole volume when the sweep has no unmasked sample of the field.
pub fn render_volume(
    volume: &Volume,
    field: &str,
    tilt: f64,
    style: &FieldStyle,
    grid: &GridParams,
) -> RadarResult<RenderOutput> {
    let index = select_sweep(&volume.sweep_angles(), tilt)?;
    let sweep = &volume.sweeps[index];

    if has_unmasked_samples(volume, sweep, field)? {
        return Ok(RenderOutput {
            features: render_polar(sweep, field, style)?,
            sweep: index,
            gridded: false,
        });
    }

    warn!(field = %field, sweep = index, "No unmasked polar samples, gridding");
    let cartesian = gridify(volume, field, grid)?;
    Ok(RenderOutput {
        features: render_grid(&cartesian, style),
        sweep: index,
        gridded: true,
    })
}

/// Gate coordinates and values of the selected sweep, or the fallback grid.
pub fn raw_field_grid(volume: &Volume, field: &str, tilt: f64, grid: &GridParams) -> RadarResult<FieldGrid> {
    let index = select_sweep(&volume.sweep_angles(), tilt)?;
    let sweep = &volume.sweeps[index];
    let elevation_angle = sweep.fixed_angle as f64;

    if has_unmasked_samples(volume, sweep, field)? {
        let data = sweep.field(field)?;
        let values: Vec<f32> = data
            .values()
            .iter()
            .zip(data.mask())
            .map(|(&v, &masked)| if masked || !is_usable(v) { f32::NAN } else { v })
            .collect();
        return Ok(FieldGrid {
            field: field.to_string(),
            elevation_angle,
            shape: [sweep.n_rays(), sweep.n_gates()],
            latitude: sanitize(sweep.gate_latitude()),
            longitude: sanitize(sweep.gate_longitude()),
            values: sanitize(&values),
            gridded: false,
        });
    }

    let cartesian = gridify(volume, field, grid)?;
    let (rows, cols) = cartesian.shape();
    Ok(FieldGrid {
        field: field.to_string(),
        elevation_angle,
        shape: [rows, cols],
        latitude: sanitize(&cartesian.latitude),
        longitude: sanitize(&cartesian.longitude),
        values: sanitize(&cartesian.values),
        gridded: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{
        create_constant_sweep, create_masked_sweep, create_polar_sweep_at, create_sentinel_sweep,
        create_volume,
    };

    fn style() -> FieldStyle {
        ColorConfig::default().style_for("reflectivity")
    }

    #[test]
    fn test_unmasked_sentinel_sweep_stays_polar() {
        let volume = create_volume(vec![create_sentinel_sweep("reflectivity", 36, 20)]);
        let output =
            render_volume(&volume, "reflectivity", 0.5, &style(), &GridParams::default()).unwrap();
        assert!(!output.gridded);
        assert!(output.features.is_empty());
    }

    #[test]
    fn test_masked_sweep_grids_whole_volume() {
        let volume = create_volume(vec![
            create_masked_sweep("reflectivity", 36, 60),
            create_polar_sweep_at("reflectivity", 10.0, 36, 60, |_, _| Some(42.0)),
        ]);
        let output =
            render_volume(&volume, "reflectivity", 0.5, &style(), &GridParams::default()).unwrap();
        assert!(output.gridded);
        assert_eq!(output.sweep, 0);
        assert!(!output.features.is_empty());
        assert!(output.features.iter().all(|f| f.value == 42.0));
    }

    #[test]
    fn test_field_missing_from_sweep_only_grids() {
        // Split cut: the lowest sweep never recorded velocity.
        let volume = create_volume(vec![
            create_constant_sweep("reflectivity", 36, 60, 30.0),
            create_polar_sweep_at("velocity", 10.0, 36, 60, |_, _| Some(-3.0)),
        ]);
        let output =
            render_volume(&volume, "velocity", 0.5, &style(), &GridParams::default()).unwrap();
        assert!(output.gridded);
        assert!(!output.features.is_empty());

        let grid = raw_field_grid(&volume, "velocity", 0.5, &GridParams::default()).unwrap();
        assert!(grid.gridded);
        assert_eq!(grid.shape, [500, 500]);
        assert!(grid.values.iter().any(|v| *v == Some(-3.0)));
    }

    #[test]
    fn test_field_absent_from_volume_is_not_found() {
        let volume = create_volume(vec![create_constant_sweep("reflectivity", 4, 4, 30.0)]);
        let err = render_volume(&volume, "velocity", 0.5, &style(), &GridParams::default())
            .unwrap_err();
        assert_eq!(err.http_status_code(), 404);
    }

    #[test]
    fn test_station_validation() {
        assert!(validate_station("KTLX").is_ok());
        assert!(validate_station("").is_err());
        assert!(validate_station("../KTLX").is_err());
        assert!(validate_station("KT LX").is_err());
    }
}
