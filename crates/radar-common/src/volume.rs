//! Decoded radar volume types and the decoder contract.
//!
//! The acquisition side only ever sees archive bytes. Everything downstream
//! (sweep selection, gridding, rendering) consumes a [`Volume`] produced by
//! some [`VolumeDecoder`].

use std::collections::{BTreeMap, BTreeSet};

use crate::error::DecodeError;
use crate::geo::SiteLocation;

/// Fill value some producers write instead of masking a gate.
pub const MISSING_SENTINEL: f32 = -9999.0;

/// Decodes a complete archive into a volume of sweeps.
pub trait VolumeDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Volume, DecodeError>;
}

/// 2D array (rays × gates) with a validity mask.
///
/// Row-major. A `true` mask entry marks the sample as invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
    mask: Vec<bool>,
}

impl MaskedArray {
    /// A fully masked array.
    pub fn masked(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![f32::NAN; rows * cols],
            mask: vec![true; rows * cols],
        }
    }

    /// Build from plain values; nothing is masked.
    pub fn from_values(rows: usize, cols: usize, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), rows * cols, "value count must match shape");
        Self {
            rows,
            cols,
            mask: vec![false; values.len()],
            values,
        }
    }

    /// Build from optional samples, `None` being masked.
    pub fn from_options(rows: usize, cols: usize, samples: Vec<Option<f32>>) -> Self {
        assert_eq!(samples.len(), rows * cols, "sample count must match shape");
        let mask = samples.iter().map(Option::is_none).collect();
        let values = samples.into_iter().map(|s| s.unwrap_or(f32::NAN)).collect();
        Self {
            rows,
            cols,
            values,
            mask,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Sample at `(row, col)`; `None` when masked or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = row * self.cols + col;
        (!self.mask[idx]).then(|| self.values[idx])
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<f32>) {
        let idx = row * self.cols + col;
        self.mask[idx] = value.is_none();
        self.values[idx] = value.unwrap_or(f32::NAN);
    }

    /// Number of samples not masked, whatever their value.
    pub fn unmasked_count(&self) -> usize {
        self.mask.iter().filter(|&&masked| !masked).count()
    }

    /// Number of samples that would survive rendering.
    pub fn usable_count(&self) -> usize {
        self.values
            .iter()
            .zip(&self.mask)
            .filter(|(&v, &masked)| !masked && is_usable(v))
            .count()
    }

    /// Raw values, masked entries included.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }
}

/// A value is renderable when it is finite and not the missing sentinel.
pub fn is_usable(value: f32) -> bool {
    value.is_finite() && value != MISSING_SENTINEL
}

/// One elevation sweep.
#[derive(Debug, Clone)]
pub struct Sweep {
    /// Nominal elevation angle in degrees
    pub fixed_angle: f32,
    /// Azimuth of each ray in degrees
    pub azimuths: Vec<f32>,
    /// Measured elevation of each ray in degrees
    pub elevations: Vec<f32>,
    /// Range to the centre of each gate in meters
    pub ranges_m: Vec<f32>,
    /// Field name -> rays × gates samples
    pub fields: BTreeMap<String, MaskedArray>,
    gate_latitude: Vec<f64>,
    gate_longitude: Vec<f64>,
}

impl Sweep {
    /// Create a sweep and compute gate coordinates around `site`.
    pub fn new(
        site: &SiteLocation,
        fixed_angle: f32,
        azimuths: Vec<f32>,
        elevations: Vec<f32>,
        ranges_m: Vec<f32>,
        fields: BTreeMap<String, MaskedArray>,
    ) -> Self {
        let mut sweep = Self {
            fixed_angle,
            azimuths,
            elevations,
            ranges_m,
            fields,
            gate_latitude: Vec::new(),
            gate_longitude: Vec::new(),
        };
        sweep.compute_gate_coordinates(site);
        sweep
    }

    pub fn n_rays(&self) -> usize {
        self.azimuths.len()
    }

    pub fn n_gates(&self) -> usize {
        self.ranges_m.len()
    }

    pub fn field(&self, name: &str) -> Result<&MaskedArray, DecodeError> {
        self.fields
            .get(name)
            .ok_or_else(|| DecodeError::FieldNotFound(name.to_string()))
    }

    /// `(latitude, longitude)` of gate `(ray, gate)`.
    pub fn gate_position(&self, ray: usize, gate: usize) -> (f64, f64) {
        let idx = ray * self.n_gates() + gate;
        (self.gate_latitude[idx], self.gate_longitude[idx])
    }

    /// Row-major gate latitudes (rays × gates).
    pub fn gate_latitude(&self) -> &[f64] {
        &self.gate_latitude
    }

    /// Row-major gate longitudes (rays × gates).
    pub fn gate_longitude(&self) -> &[f64] {
        &self.gate_longitude
    }

    fn compute_gate_coordinates(&mut self, site: &SiteLocation) {
        let n = self.n_rays() * self.n_gates();
        self.gate_latitude = Vec::with_capacity(n);
        self.gate_longitude = Vec::with_capacity(n);

        for (ray, &azimuth) in self.azimuths.iter().enumerate() {
            let elevation = self
                .elevations
                .get(ray)
                .copied()
                .unwrap_or(self.fixed_angle);
            for &range in &self.ranges_m {
                let (lat, lon) =
                    site.gate_position(range as f64, azimuth as f64, elevation as f64);
                self.gate_latitude.push(lat);
                self.gate_longitude.push(lon);
            }
        }
    }
}

/// A decoded volume scan.
#[derive(Debug, Clone)]
pub struct Volume {
    /// ICAO station identifier
    pub station: String,
    pub site: SiteLocation,
    /// Sweeps in acquisition order
    pub sweeps: Vec<Sweep>,
}

impl Volume {
    /// Fixed angle of every sweep, in sweep order.
    pub fn sweep_angles(&self) -> Vec<f32> {
        self.sweeps.iter().map(|s| s.fixed_angle).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.sweeps.iter().any(|s| s.fields.contains_key(name))
    }

    /// Every field name present in any sweep, sorted.
    pub fn field_names(&self) -> Vec<String> {
        self.sweeps
            .iter()
            .flat_map(|s| s.fields.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
