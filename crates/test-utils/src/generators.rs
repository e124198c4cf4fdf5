//! Synthetic sweep generators.
//!
//! These create small, predictable polar sweeps so renderer and pipeline
//! tests can check exact feature counts and values.

use std::collections::BTreeMap;

use radar_common::{MaskedArray, SiteLocation, Sweep, Volume, MISSING_SENTINEL};

/// Range to the first gate used by generated sweeps (meters).
pub const FIRST_GATE_M: f32 = 2125.0;

/// Gate spacing used by generated sweeps (meters).
pub const GATE_SPACING_M: f32 = 250.0;

/// A site near Oklahoma City (KTLX).
pub fn test_site() -> SiteLocation {
    SiteLocation::new(35.3331, -97.2778, 390.0)
}

/// Creates a polar sweep with one field whose samples come from `value`.
///
/// Rays are evenly spaced in azimuth starting at half a ray width, so ray
/// `i` points at `(i + 0.5) * 360 / rays` degrees.
///
/// # Example
///
/// ```
/// use test_utils::create_polar_sweep;
///
/// let sweep = create_polar_sweep("reflectivity", 4, 3, |ray, gate| Some((ray * 10 + gate) as f32));
/// assert_eq!(sweep.field("reflectivity").unwrap().get(2, 1), Some(21.0));
/// ```
pub fn create_polar_sweep<F>(field: &str, rays: usize, gates: usize, value: F) -> Sweep
where
    F: Fn(usize, usize) -> Option<f32>,
{
    create_polar_sweep_at(field, 0.5, rays, gates, value)
}

/// Like [`create_polar_sweep`], at elevation `elevation` degrees.
pub fn create_polar_sweep_at<F>(
    field: &str,
    elevation: f32,
    rays: usize,
    gates: usize,
    value: F,
) -> Sweep
where
    F: Fn(usize, usize) -> Option<f32>,
{
    let samples = (0..rays)
        .flat_map(|ray| (0..gates).map(move |gate| (ray, gate)))
        .map(|(ray, gate)| value(ray, gate))
        .collect();

    let mut fields = BTreeMap::new();
    fields.insert(
        field.to_string(),
        MaskedArray::from_options(rays, gates, samples),
    );

    Sweep::new(
        &test_site(),
        elevation,
        azimuths(rays),
        vec![elevation; rays],
        (0..gates)
            .map(|g| FIRST_GATE_M + g as f32 * GATE_SPACING_M)
            .collect(),
        fields,
    )
}

/// Every sample set to `value`.
pub fn create_constant_sweep(field: &str, rays: usize, gates: usize, value: f32) -> Sweep {
    create_polar_sweep(field, rays, gates, |_, _| Some(value))
}

/// Every sample masked.
pub fn create_masked_sweep(field: &str, rays: usize, gates: usize) -> Sweep {
    create_polar_sweep(field, rays, gates, |_, _| None)
}

/// Every sample equal to the missing sentinel (unmasked).
pub fn create_sentinel_sweep(field: &str, rays: usize, gates: usize) -> Sweep {
    create_constant_sweep(field, rays, gates, MISSING_SENTINEL)
}

/// A volume at [`test_site`] holding `sweeps` in order.
pub fn create_volume(sweeps: Vec<Sweep>) -> Volume {
    Volume {
        station: "KTLX".to_string(),
        site: test_site(),
        sweeps,
    }
}

/// Evenly spaced ray azimuths.
pub fn azimuths(rays: usize) -> Vec<f32> {
    let width = 360.0 / rays.max(1) as f32;
    (0..rays).map(|i| (i as f32 + 0.5) * width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polar_sweep_shape() {
        let sweep = create_constant_sweep("velocity", 6, 4, 12.5);
        assert_eq!(sweep.n_rays(), 6);
        assert_eq!(sweep.n_gates(), 4);
        assert_eq!(sweep.field("velocity").unwrap().usable_count(), 24);
    }

    #[test]
    fn test_sentinel_sweep_has_no_usable_samples() {
        let sweep = create_sentinel_sweep("reflectivity", 3, 3);
        let field = sweep.field("reflectivity").unwrap();
        assert_eq!(field.get(0, 0), Some(MISSING_SENTINEL));
        assert_eq!(field.usable_count(), 0);
    }

    #[test]
    fn test_sweep_at_elevation() {
        let sweep = create_polar_sweep_at("reflectivity", 10.0, 4, 2, |_, _| Some(1.0));
        assert_eq!(sweep.fixed_angle, 10.0);
        assert_eq!(sweep.elevations, vec![10.0; 4]);

        let volume = create_volume(vec![create_masked_sweep("reflectivity", 4, 2), sweep]);
        assert_eq!(volume.sweep_angles(), vec![0.5, 10.0]);
    }

    #[test]
    fn test_azimuths() {
        assert_eq!(azimuths(4), vec![45.0, 135.0, 225.0, 315.0]);
    }
}
