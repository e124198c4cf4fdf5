//! Common types and utilities shared across the radar services.

pub mod error;
pub mod geo;
pub mod sanitize;
pub mod style;
pub mod time;
pub mod volume;

pub use error::{DecodeError, RadarError, RadarResult};
pub use geo::SiteLocation;
pub use sanitize::sanitize;
pub use style::{ColorConfig, FieldStyle, Rgb};
pub use time::{ScanTimestamp, TimestampParseError};
pub use volume::{MaskedArray, Sweep, Volume, VolumeDecoder, MISSING_SENTINEL};
