//! Radar beam geometry.
//!
//! Gate positions follow the usual 4/3 effective earth radius beam model and
//! an azimuthal equidistant projection centred on the radar site.

use serde::{Deserialize, Serialize};

/// Earth radius used by the azimuthal equidistant projection (meters).
pub const EARTH_RADIUS_M: f64 = 6_370_997.0;

/// Effective radius multiplier for standard atmospheric refraction.
const EFFECTIVE_RADIUS_FACTOR: f64 = 4.0 / 3.0;

/// Radar site location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteLocation {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Antenna height above sea level in meters
    pub altitude_m: f64,
}

impl SiteLocation {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m,
        }
    }

    /// Geographic position of a gate.
    ///
    /// Returns `(latitude, longitude)` in degrees.
    pub fn gate_position(&self, range_m: f64, azimuth_deg: f64, elevation_deg: f64) -> (f64, f64) {
        let (x, y, _) = antenna_to_cartesian(range_m, azimuth_deg, elevation_deg);
        self.xy_to_geographic(x, y)
    }

    /// Inverse azimuthal equidistant projection around this site.
    pub fn xy_to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        let lat0 = self.latitude.to_radians();
        let lon0 = self.longitude.to_radians();

        let rho = x.hypot(y);
        if rho == 0.0 {
            return (self.latitude, self.longitude);
        }

        let c = rho / EARTH_RADIUS_M;
        let lat = (c.cos() * lat0.sin() + y * c.sin() * lat0.cos() / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lon = lon0
            + (x * c.sin()).atan2(rho * lat0.cos() * c.cos() - y * lat0.sin() * c.sin());

        (lat.to_degrees(), normalize_longitude(lon.to_degrees()))
    }

    /// Forward azimuthal equidistant projection around this site.
    ///
    /// Returns `(x, y)` in meters east and north of the site.
    pub fn geographic_to_xy(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        let lat0 = self.latitude.to_radians();
        let lat = latitude.to_radians();
        let dlon = (longitude - self.longitude).to_radians();

        let cos_c = (lat0.sin() * lat.sin() + lat0.cos() * lat.cos() * dlon.cos()).clamp(-1.0, 1.0);
        let c = cos_c.acos();
        let k = if c.abs() < 1e-12 { 1.0 } else { c / c.sin() };

        let x = EARTH_RADIUS_M * k * lat.cos() * dlon.sin();
        let y = EARTH_RADIUS_M * k * (lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * dlon.cos());
        (x, y)
    }
}

/// Convert antenna coordinates to site-relative cartesian coordinates.
///
/// Returns `(x, y, z)` in meters, `z` being the beam height above the antenna.
pub fn antenna_to_cartesian(range_m: f64, azimuth_deg: f64, elevation_deg: f64) -> (f64, f64, f64) {
    let r_eff = EARTH_RADIUS_M * EFFECTIVE_RADIUS_FACTOR;
    let elev = elevation_deg.to_radians();
    let az = azimuth_deg.to_radians();

    let z = (range_m * range_m + r_eff * r_eff + 2.0 * range_m * r_eff * elev.sin()).sqrt() - r_eff;
    let s = r_eff * (range_m * elev.cos() / (r_eff + z)).asin();

    (s * az.sin(), s * az.cos(), z)
}

fn normalize_longitude(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}
