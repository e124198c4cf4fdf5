//! Colorized features from polar or gridded samples.

use radar_common::volume::is_usable;
use radar_common::{FieldStyle, RadarResult, Sweep};
use rayon::prelude::*;

use crate::colormap::Colormap;
use crate::gridding::CartesianGrid;

/// Feature geometry, coordinates as `(latitude, longitude)`.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureShape {
    Point((f64, f64)),
    /// Corners in order `(r,g)`, `(r,g+1)`, `(r+1,g+1)`, `(r+1,g)`
    Quad([(f64, f64); 4]),
}

/// One coloured sample ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub shape: FeatureShape,
    pub value: f64,
    /// `#rrggbb`
    pub color: String,
}

/// One quadrilateral per polar cell with a usable value.
///
/// Cell `(r, g)` spans gates `g..=g+1` of rays `r..=r+1`, so the last ray and
/// the last gate start no cell. The seam between the last and first ray is
/// left open. Output is in ray-major order.
pub fn render_polar(sweep: &Sweep, field: &str, style: &FieldStyle) -> RadarResult<Vec<RenderedFeature>> {
    let data = sweep.field(field)?;
    let colormap = Colormap::by_name_or_default(&style.colormap);
    let (rays, gates) = (sweep.n_rays(), sweep.n_gates());

    if rays < 2 || gates < 2 {
        return Ok(Vec::new());
    }

    let features = (0..rays - 1)
        .into_par_iter()
        .flat_map_iter(|r| {
            (0..gates - 1).filter_map(move |g| {
                let value = data.get(r, g).filter(|v| is_usable(*v))?;
                let corners = [
                    sweep.gate_position(r, g),
                    sweep.gate_position(r, g + 1),
                    sweep.gate_position(r + 1, g + 1),
                    sweep.gate_position(r + 1, g),
                ];
                Some(RenderedFeature {
                    shape: FeatureShape::Quad(corners),
                    value: value as f64,
                    color: colormap.sample(style.normalize(value as f64)).to_hex(),
                })
            })
        })
        .collect();

    Ok(features)
}

/// One point per grid cell with a usable value, row-major.
pub fn render_grid(grid: &CartesianGrid, style: &FieldStyle) -> Vec<RenderedFeature> {
    let colormap = Colormap::by_name_or_default(&style.colormap);

    grid.values
        .iter()
        .enumerate()
        .filter(|(_, v)| is_usable(**v))
        .map(|(idx, &value)| RenderedFeature {
            shape: FeatureShape::Point((grid.latitude[idx], grid.longitude[idx])),
            value: value as f64,
            color: colormap.sample(style.normalize(value as f64)).to_hex(),
        })
        .collect()
}
