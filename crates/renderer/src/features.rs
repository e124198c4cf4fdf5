//! GeoJSON output for rendered features.
//!
//! Positions are `[longitude, latitude]`. Polygon rings are closed by
//! repeating the first corner.

use serde::{Deserialize, Serialize};

use crate::polygons::{FeatureShape, RenderedFeature};

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<RenderedFeature>> for FeatureCollection {
    fn from(features: Vec<RenderedFeature>) -> Self {
        Self::new().with_features(features.into_iter().map(Feature::from).collect())
    }
}

/// A GeoJSON Feature carrying the sample value and its colour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: Geometry,

    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureProperties {
    pub value: f64,
    pub color: String,
}

/// Supported geometry types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },

    Polygon {
        /// Exterior ring only.
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

impl From<&FeatureShape> for Geometry {
    fn from(shape: &FeatureShape) -> Self {
        match shape {
            FeatureShape::Point((lat, lon)) => Geometry::Point {
                coordinates: [*lon, *lat],
            },
            FeatureShape::Quad(corners) => {
                let mut ring: Vec<[f64; 2]> =
                    corners.iter().map(|(lat, lon)| [*lon, *lat]).collect();
                ring.push(ring[0]);
                Geometry::Polygon {
                    coordinates: vec![ring],
                }
            }
        }
    }
}

impl From<RenderedFeature> for Feature {
    fn from(feature: RenderedFeature) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: Geometry::from(&feature.shape),
            properties: FeatureProperties {
                value: feature.value,
                color: feature.color,
            },
        }
    }
}
