//! Sweep selection by elevation angle.

use radar_common::{RadarError, RadarResult};

/// Index of the sweep whose angle is closest to `requested`.
///
/// Ties resolve to the lowest index.
pub fn select_sweep(angles: &[f32], requested: f64) -> RadarResult<usize> {
    if !requested.is_finite() {
        return Err(RadarError::invalid_argument(format!(
            "elevation angle must be finite, got {}",
            requested
        )));
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, &angle) in angles.iter().enumerate() {
        let diff = (angle as f64 - requested).abs();
        if best.map_or(true, |(_, d)| diff < d) {
            best = Some((index, diff));
        }
    }

    best.map(|(index, _)| index)
        .ok_or_else(|| RadarError::invalid_argument("volume has no sweeps"))
}

/// Sweep angles rounded to two decimals, duplicates removed, first
/// occurrence order kept.
///
/// Angles closer than the rounding step collapse into one entry.
pub fn elevation_angles(angles: &[f32]) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::with_capacity(angles.len());
    for &angle in angles {
        let rounded = round2(angle as f64);
        if !out.contains(&rounded) {
            out.push(rounded);
        }
    }
    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_sweep() {
        assert_eq!(select_sweep(&[0.5, 1.5, 2.5], 1.0).unwrap(), 0);
        assert_eq!(select_sweep(&[0.5, 1.5, 2.5], 1.1).unwrap(), 1);
        assert_eq!(select_sweep(&[0.5, 1.5, 2.5], 19.5).unwrap(), 2);
        assert_eq!(select_sweep(&[0.5, 1.5, 2.5], -3.0).unwrap(), 0);
    }

    #[test]
    fn test_tie_takes_lowest_index() {
        assert_eq!(select_sweep(&[0.5, 0.5, 1.5], 0.5).unwrap(), 0);
        assert_eq!(select_sweep(&[1.5, 0.5], 1.0).unwrap(), 0);
    }

    #[test]
    fn test_empty_or_bad_request() {
        let err = select_sweep(&[], 0.5).unwrap_err();
        assert_eq!(err.http_status_code(), 400);
        assert!(select_sweep(&[0.5], f64::NAN).is_err());
    }

    #[test]
    fn test_elevation_angles_dedup() {
        assert_eq!(elevation_angles(&[0.498, 0.502, 1.5]), vec![0.5, 1.5]);
        assert_eq!(
            elevation_angles(&[0.48, 0.48, 1.32, 0.48, 1.8]),
            vec![0.48, 1.32, 1.8]
        );
        assert!(elevation_angles(&[]).is_empty());
    }
}
