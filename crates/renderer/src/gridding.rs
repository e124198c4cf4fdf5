//! Polar to cartesian fallback gridding.
//!
//! Gates of every sweep in the volume are projected onto an azimuthal
//! equidistant plane centred on the site and binned into a single horizontal
//! layer. Only gates whose beam height lies within the layer tolerance of the
//! layer altitude take part. Each cell takes the value of the usable gate
//! nearest its centre; cells that receive no gate stay NaN.

use radar_common::geo::antenna_to_cartesian;
use radar_common::volume::is_usable;
use radar_common::{DecodeError, RadarError, RadarResult, Sweep, Volume};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cartesian grid geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    /// Cells along x (east)
    pub nx: usize,
    /// Cells along y (north)
    pub ny: usize,
    /// Half the grid extent in meters; the grid spans `[-h, h]` on both axes
    pub half_width_m: f64,
    /// Altitude of the single grid layer above the antenna (meters)
    pub altitude_m: f64,
    /// Maximum distance between beam height and layer altitude (meters)
    pub layer_tolerance_m: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            nx: 500,
            ny: 500,
            half_width_m: 150_000.0,
            altitude_m: 2_000.0,
            layer_tolerance_m: 500.0,
        }
    }
}

impl GridParams {
    pub fn cell_width(&self) -> f64 {
        2.0 * self.half_width_m / self.nx as f64
    }

    pub fn cell_height(&self) -> f64 {
        2.0 * self.half_width_m / self.ny as f64
    }

    /// Centre of cell `(row, col)`; row 0 is the southern edge.
    pub fn cell_centre(&self, row: usize, col: usize) -> (f64, f64) {
        (
            -self.half_width_m + (col as f64 + 0.5) * self.cell_width(),
            -self.half_width_m + (row as f64 + 0.5) * self.cell_height(),
        )
    }

    /// Cell containing `(x, y)`, if inside the grid.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x + self.half_width_m) / self.cell_width()).floor();
        let row = ((y + self.half_width_m) / self.cell_height()).floor();
        if col < 0.0 || row < 0.0 || col >= self.nx as f64 || row >= self.ny as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    fn validate(&self) -> RadarResult<()> {
        if self.nx == 0
            || self.ny == 0
            || !(self.half_width_m > 0.0)
            || !(self.layer_tolerance_m >= 0.0)
        {
            return Err(RadarError::invalid_argument(format!(
                "invalid grid parameters {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Gridded field values with their cell-centre coordinates.
///
/// All three arrays are row-major `ny × nx`.
#[derive(Debug, Clone)]
pub struct CartesianGrid {
    pub params: GridParams,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    /// NaN where no gate fell in the cell
    pub values: Vec<f32>,
}

impl CartesianGrid {
    pub fn shape(&self) -> (usize, usize) {
        (self.params.ny, self.params.nx)
    }

    pub fn value(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.params.nx + col]
    }

    pub fn usable_count(&self) -> usize {
        self.values.iter().filter(|v| is_usable(**v)).count()
    }
}

/// A gate that landed in a cell: `(cell index, squared distance to the cell
/// centre, value)`.
type Candidate = (usize, f64, f32);

/// Grid one field of a volume onto the layer described by `params`.
///
/// Sweeps without the field are skipped; a field absent from every sweep is
/// an error. Ties between equally distant gates go to the lower sweep, then
/// the lower ray, then the lower gate.
pub fn gridify(volume: &Volume, field: &str, params: &GridParams) -> RadarResult<CartesianGrid> {
    params.validate()?;
    if !volume.has_field(field) {
        return Err(DecodeError::FieldNotFound(field.to_string()).into());
    }
    let (nx, ny) = (params.nx, params.ny);

    let mut best: Vec<Option<(f64, f32)>> = vec![None; nx * ny];
    for sweep in &volume.sweeps {
        for (cell, dist, value) in layer_candidates(sweep, field, params) {
            let slot = &mut best[cell];
            if slot.map_or(true, |(d, _)| dist < d) {
                *slot = Some((dist, value));
            }
        }
    }

    let values: Vec<f32> = best
        .into_iter()
        .map(|cell| cell.map_or(f32::NAN, |(_, v)| v))
        .collect();

    let site = &volume.site;
    let (latitude, longitude): (Vec<f64>, Vec<f64>) = (0..ny * nx)
        .into_par_iter()
        .map(|idx| {
            let (x, y) = params.cell_centre(idx / nx, idx % nx);
            site.xy_to_geographic(x, y)
        })
        .unzip();

    let grid = CartesianGrid {
        params: *params,
        latitude,
        longitude,
        values,
    };

    debug!(
        field = %field,
        rows = ny,
        cols = nx,
        altitude_m = params.altitude_m,
        filled = grid.usable_count(),
        "Gridded volume"
    );
    Ok(grid)
}

/// Usable gates of one sweep that fall inside the layer and the grid, in
/// ray-major order.
fn layer_candidates(sweep: &Sweep, field: &str, params: &GridParams) -> Vec<Candidate> {
    let Ok(data) = sweep.field(field) else {
        return Vec::new();
    };

    (0..sweep.n_rays())
        .into_par_iter()
        .flat_map_iter(|ray| {
            let azimuth = sweep.azimuths[ray] as f64;
            let elevation = sweep
                .elevations
                .get(ray)
                .copied()
                .unwrap_or(sweep.fixed_angle) as f64;

            sweep.ranges_m.iter().enumerate().filter_map(move |(gate, &range)| {
                let value = data.get(ray, gate).filter(|v| is_usable(*v))?;
                let (x, y, z) = antenna_to_cartesian(range as f64, azimuth, elevation);
                let dz = z - params.altitude_m;
                if dz.abs() > params.layer_tolerance_m {
                    return None;
                }
                let (row, col) = params.cell_of(x, y)?;
                let (cx, cy) = params.cell_centre(row, col);
                let dist = (x - cx).powi(2) + (y - cy).powi(2) + dz.powi(2);
                Some((row * params.nx + col, dist, value))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_params() {
        let p = GridParams::default();
        assert_eq!((p.nx, p.ny), (500, 500));
        assert_eq!(p.cell_width(), 600.0);
        assert_eq!(p.cell_centre(0, 0), (-149_700.0, -149_700.0));
    }

    #[test]
    fn test_cell_of_bounds() {
        let p = GridParams {
            nx: 4,
            ny: 4,
            half_width_m: 100.0,
            altitude_m: 0.0,
            layer_tolerance_m: 0.0,
        };
        assert_eq!(p.cell_of(-100.0, -100.0), Some((0, 0)));
        assert_eq!(p.cell_of(99.0, 0.0), Some((2, 3)));
        assert_eq!(p.cell_of(100.0, 0.0), None);
        assert_eq!(p.cell_of(0.0, -101.0), None);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let p = GridParams {
            layer_tolerance_m: -1.0,
            ..GridParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_zero_cells_rejected() {
        let p = GridParams {
            nx: 0,
            ..GridParams::default()
        };
        assert!(p.validate().is_err());
    }
}
