//! Colour configuration for rendering radar fields.
//!
//! A [`ColorConfig`] maps each radar field name to a colormap identifier and
//! the value range used to normalize samples before colour lookup. It is
//! built once at startup (built-in table, optionally replaced by a JSON file)
//! and handed to the renderer by reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Colormap used for fields with no configured entry.
pub const DEFAULT_COLORMAP: &str = "viridis";

/// Normalization range used for fields with no configured entry.
pub const DEFAULT_RANGE: (f64, f64) = (0.0, 75.0);

/// Root colour configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Version of the schema
    #[serde(default = "default_version")]
    pub version: String,

    /// Per-field styles keyed by field name
    pub fields: HashMap<String, FieldStyle>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ColorConfig {
    /// Load colour configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| StyleError::IoError(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse colour configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, StyleError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StyleError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Configured style for a field, if any.
    pub fn get(&self, field: &str) -> Option<&FieldStyle> {
        self.fields.get(field)
    }

    /// Style for a field, falling back to the default colormap and range.
    pub fn style_for(&self, field: &str) -> FieldStyle {
        self.get(field).cloned().unwrap_or_default()
    }

    /// Validate all entries.
    pub fn validate(&self) -> Result<(), StyleError> {
        for (name, style) in &self.fields {
            style
                .validate()
                .map_err(|e| StyleError::ValidationError(format!("{}: {}", name, e)))?;
        }
        Ok(())
    }
}

impl Default for ColorConfig {
    /// The standard NEXRAD moment table.
    fn default() -> Self {
        let entries = [
            ("reflectivity", "NWSRef", -10.0, 75.0),
            ("velocity", "NWSVel", -30.0, 30.0),
            ("spectrum_width", "NWS_SPW", 0.0, 30.0),
            ("differential_reflectivity", "RefDiff", -2.0, 8.0),
            ("differential_phase", "Wild25", 0.0, 360.0),
            ("cross_correlation_ratio", "RefDiff", 0.5, 1.05),
            ("clutter_filter_power_removed", "viridis", 0.0, 60.0),
        ];

        let fields = entries
            .iter()
            .map(|&(field, colormap, min, max)| {
                (
                    field.to_string(),
                    FieldStyle {
                        colormap: colormap.to_string(),
                        min,
                        max,
                    },
                )
            })
            .collect();

        Self {
            version: default_version(),
            fields,
        }
    }
}

/// Colormap and normalization range for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStyle {
    pub colormap: String,
    pub min: f64,
    pub max: f64,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            colormap: DEFAULT_COLORMAP.to_string(),
            min: DEFAULT_RANGE.0,
            max: DEFAULT_RANGE.1,
        }
    }
}

impl FieldStyle {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err("range bounds must be finite".to_string());
        }
        if self.min >= self.max {
            return Err(format!("min {} must be below max {}", self.min, self.max));
        }
        Ok(())
    }

    /// Linear clamp-scaling of `value` into `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation between two colours.
    pub fn lerp(&self, other: &Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp_u8 =
            |a: u8, b: u8| -> u8 { ((a as f64) * (1.0 - t) + (b as f64) * t).round() as u8 };
        Rgb {
            r: lerp_u8(self.r, other.r),
            g: lerp_u8(self.g, other.g),
            b: lerp_u8(self.b, other.b),
        }
    }
}

/// Errors that can occur loading colour configuration.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
