//! Grouping radials into sweeps.

use std::collections::{BTreeMap, BTreeSet};

use radar_common::{DecodeError, MaskedArray, Sweep, Volume};

use crate::message::{Moment, Radial};

/// Upper bound on the common range axis, as a multiple of the longest
/// moment's gate count.
const MAX_AXIS_GROWTH: usize = 4;

/// Build a volume from decoded radials.
///
/// Radials are grouped by elevation number. Fields within a sweep may use
/// different gate geometry, so every field is resampled (nearest gate) onto
/// a common range axis: the smallest first-gate range and gate spacing seen
/// in the sweep, extended to the farthest gate.
///
/// Every sweep carries every field of the volume. Split cuts record some
/// moments on one sweep only; the other sweeps get a fully masked array.
pub(crate) fn build_volume(station: &str, radials: Vec<Radial>) -> Result<Volume, DecodeError> {
    let site = radials
        .iter()
        .find_map(|r| r.site)
        .ok_or_else(|| DecodeError::InvalidHeader("no volume data block in any radial".to_string()))?;

    let station = if station.is_empty() {
        radials
            .first()
            .map(|r| r.station.clone())
            .unwrap_or_default()
    } else {
        station.to_string()
    };

    let mut by_elevation: BTreeMap<u8, Vec<Radial>> = BTreeMap::new();
    for radial in radials {
        by_elevation
            .entry(radial.elevation_number)
            .or_default()
            .push(radial);
    }

    let mut sweeps = by_elevation
        .into_values()
        .map(|mut rays| {
            rays.sort_by_key(|r| r.azimuth_number);
            build_sweep(&site, &rays)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let names: BTreeSet<String> = sweeps
        .iter()
        .flat_map(|s| s.fields.keys().cloned())
        .collect();
    for sweep in &mut sweeps {
        let (rays, gates) = (sweep.n_rays(), sweep.n_gates());
        for name in &names {
            sweep
                .fields
                .entry(name.clone())
                .or_insert_with(|| MaskedArray::masked(rays, gates));
        }
    }

    Ok(Volume {
        station,
        site,
        sweeps,
    })
}

fn build_sweep(site: &radar_common::SiteLocation, rays: &[Radial]) -> Result<Sweep, DecodeError> {
    let fixed_angle =
        rays.iter().map(|r| r.elevation_angle).sum::<f32>() / rays.len().max(1) as f32;
    let azimuths: Vec<f32> = rays.iter().map(|r| r.azimuth).collect();
    let elevations: Vec<f32> = rays.iter().map(|r| r.elevation_angle).collect();
    let ranges_m = common_range_axis(rays.iter().flat_map(|r| r.moments.iter()))?;

    let mut fields: BTreeMap<String, MaskedArray> = BTreeMap::new();
    for (ray_index, ray) in rays.iter().enumerate() {
        for moment in &ray.moments {
            let array = fields
                .entry(moment.field.clone())
                .or_insert_with(|| MaskedArray::masked(rays.len(), ranges_m.len()));
            resample_into(array, ray_index, moment, &ranges_m);
        }
    }

    Ok(Sweep::new(site, fixed_angle, azimuths, elevations, ranges_m, fields))
}

fn common_range_axis<'a>(moments: impl Iterator<Item = &'a Moment>) -> Result<Vec<f32>, DecodeError> {
    let mut first = f32::INFINITY;
    let mut spacing = f32::INFINITY;
    let mut last = f32::NEG_INFINITY;
    let mut longest = 0usize;

    for m in moments.filter(|m| !m.values.is_empty() && m.gate_spacing_m > 0.0) {
        first = first.min(m.first_gate_m);
        spacing = spacing.min(m.gate_spacing_m);
        last = last.max(m.last_gate_m());
        longest = longest.max(m.values.len());
    }

    if !first.is_finite() {
        return Ok(Vec::new());
    }

    let span = ((last - first) as f64 / spacing as f64).round();
    let limit = longest * MAX_AXIS_GROWTH;
    if !span.is_finite() || span < 0.0 || span as usize + 1 > limit {
        return Err(DecodeError::InvalidHeader(format!(
            "inconsistent gate geometry: {} gates at {} m spacing exceeds {}",
            span + 1.0,
            spacing,
            limit
        )));
    }

    let count = span as usize + 1;
    Ok((0..count).map(|i| first + i as f32 * spacing).collect())
}

fn resample_into(array: &mut MaskedArray, ray: usize, moment: &Moment, ranges_m: &[f32]) {
    if moment.gate_spacing_m <= 0.0 {
        return;
    }
    for (i, &range) in ranges_m.iter().enumerate() {
        let gate = ((range - moment.first_gate_m) / moment.gate_spacing_m).round();
        if gate < 0.0 {
            continue;
        }
        if let Some(&value) = moment.values.get(gate as usize) {
            array.set(ray, i, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_common::SiteLocation;

    fn moment(field: &str, first: f32, spacing: f32, values: Vec<Option<f32>>) -> Moment {
        Moment {
            field: field.to_string(),
            first_gate_m: first,
            gate_spacing_m: spacing,
            values,
        }
    }

    fn radial(elevation_number: u8, azimuth_number: u16, moments: Vec<Moment>) -> Radial {
        Radial {
            station: "KTLX".to_string(),
            azimuth_number,
            azimuth: azimuth_number as f32,
            radial_status: 1,
            elevation_number,
            elevation_angle: 0.5 * elevation_number as f32,
            site: Some(SiteLocation::new(35.33, -97.28, 390.0)),
            moments,
        }
    }

    #[test]
    fn test_common_axis_uses_finest_spacing() {
        let ms = vec![
            moment("reflectivity", 1000.0, 1000.0, vec![Some(1.0); 4]),
            moment("velocity", 1000.0, 250.0, vec![Some(2.0); 9]),
        ];
        let axis = common_range_axis(ms.iter()).unwrap();
        assert_eq!(axis.len(), 13);
        assert_eq!(axis[0], 1000.0);
        assert_eq!(axis[12], 4000.0);
    }

    #[test]
    fn test_coarse_field_is_replicated() {
        let coarse = moment("reflectivity", 1000.0, 1000.0, vec![Some(1.0), Some(2.0)]);
        let axis = vec![1000.0, 1250.0, 1500.0, 1750.0, 2000.0];
        let mut arr = MaskedArray::masked(1, axis.len());
        resample_into(&mut arr, 0, &coarse, &axis);
        assert_eq!(arr.get(0, 0), Some(1.0));
        assert_eq!(arr.get(0, 1), Some(1.0));
        assert_eq!(arr.get(0, 3), Some(2.0));
        assert_eq!(arr.get(0, 4), Some(2.0));
    }

    #[test]
    fn test_groups_by_elevation_number() {
        let radials = vec![
            radial(2, 1, vec![moment("velocity", 1000.0, 500.0, vec![Some(3.0); 2])]),
            radial(1, 2, vec![moment("reflectivity", 1000.0, 500.0, vec![Some(10.0); 2])]),
            radial(1, 1, vec![moment("reflectivity", 1000.0, 500.0, vec![None, Some(20.0)])]),
        ];
        let volume = build_volume("KTLX", radials).unwrap();
        assert_eq!(volume.sweeps.len(), 2);
        assert_eq!(volume.sweep_angles(), vec![0.5, 1.0]);

        let first = &volume.sweeps[0];
        assert_eq!(first.azimuths, vec![1.0, 2.0]);
        let refl = first.field("reflectivity").unwrap();
        assert_eq!(refl.get(0, 0), None);
        assert_eq!(refl.get(0, 1), Some(20.0));
        assert_eq!(refl.get(1, 0), Some(10.0));
        assert_eq!(volume.sweeps[1].field("reflectivity").unwrap().usable_count(), 0);
        assert_eq!(first.field("velocity").unwrap().shape(), (2, 2));
        assert!(first.field("spectrum_width").is_err());
    }

    #[test]
    fn test_corrupt_gate_geometry_is_rejected() {
        let ms = vec![
            moment("reflectivity", 1000.0, 1.0, vec![Some(1.0); 4]),
            moment("velocity", 1000.0, 250.0, vec![Some(2.0); 4]),
            moment("spectrum_width", 60_000.0, 250.0, vec![Some(3.0); 4]),
        ];
        assert!(matches!(
            common_range_axis(ms.iter()),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_missing_volume_block_is_error() {
        let mut r = radial(1, 1, vec![]);
        r.site = None;
        assert!(matches!(
            build_volume("KTLX", vec![r]),
            Err(DecodeError::InvalidHeader(_))
        ));
    }
}
