//! Rendering of decoded radar sweeps for map display.
//!
//! Implements:
//! - Sweep selection by elevation angle
//! - Colormaps and value-to-colour mapping
//! - Polar cell polygons
//! - Cartesian fallback gridding (for sweeps with no usable samples)
//! - GeoJSON output

pub mod colormap;
pub mod features;
pub mod gridding;
pub mod polygons;
pub mod sweep;

pub use colormap::{color_for, Colormap};
pub use features::{Feature, FeatureCollection, FeatureProperties, Geometry};
pub use gridding::{gridify, CartesianGrid, GridParams};
pub use polygons::{render_grid, render_polar, FeatureShape, RenderedFeature};
pub use sweep::{elevation_angles, select_sweep};
