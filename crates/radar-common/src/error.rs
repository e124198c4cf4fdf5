//! Error types for the radar services.

use thiserror::Error;

/// Result type alias using RadarError.
pub type RadarResult<T> = Result<T, RadarError>;

/// Primary error type for scan acquisition and rendering.
#[derive(Debug, Error)]
pub enum RadarError {
    // === Acquisition Errors ===
    #[error("Listing failed for station {station}: {message}")]
    Listing { station: String, message: String },

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("No files found for the latest scan of {0}")]
    NoScans(String),

    // === Data Errors ===
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Radar file not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === Infrastructure Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RadarError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            RadarError::InvalidArgument(_) => 400,

            RadarError::NotFound(_) | RadarError::NoScans(_) => 404,

            RadarError::Decode(DecodeError::FieldNotFound(_)) => 404,
            RadarError::Decode(_) => 422,

            RadarError::Listing { .. } | RadarError::Storage(_) => 502,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for RadarError {
    fn from(err: std::io::Error) -> Self {
        RadarError::Internal(err.to_string())
    }
}

/// Errors raised while decoding a radar archive.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("archive truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid archive header: {0}")]
    InvalidHeader(String),

    #[error("failed to decompress record at byte {offset}: {message}")]
    Bzip2 { offset: usize, message: String },

    #[error("archive contains no radials")]
    NoRadials,

    #[error("field '{0}' not present in sweep")]
    FieldNotFound(String),
}
