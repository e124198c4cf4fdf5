//! Storage error types.

use radar_common::RadarError;
use thiserror::Error;

/// Failure talking to the remote chunk store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create object store client: {0}")]
    Client(String),

    #[error("Failed to list {prefix}: {message}")]
    List { prefix: String, message: String },

    #[error("Failed to read {key}: {message}")]
    Read { key: String, message: String },
}

/// Listing a station's chunks failed; nothing from the partial listing is kept.
#[derive(Debug, Error)]
#[error("Listing failed for station {station}: {source}")]
pub struct ListingError {
    pub station: String,
    #[source]
    pub source: StorageError,
}

/// Failure assembling a scan into an archive.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("No chunks could be downloaded for {station} scan {timestamp}")]
    NoChunks { station: String, timestamp: String },

    #[error("I/O error during assembly: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ListingError> for RadarError {
    fn from(e: ListingError) -> Self {
        RadarError::Listing {
            station: e.station,
            message: e.source.to_string(),
        }
    }
}

impl From<AssemblyError> for RadarError {
    fn from(e: AssemblyError) -> Self {
        RadarError::Assembly(e.to_string())
    }
}

impl From<StorageError> for RadarError {
    fn from(e: StorageError) -> Self {
        RadarError::Storage(e.to_string())
    }
}
