//! Scan timestamps.
//!
//! Chunk keys carry the acquisition time as `YYYYMMDD-HHMMSS`. Internally the
//! two halves are joined into a fixed-width 14 digit string. Fixed width is
//! what makes lexicographic order equal chronological order, so the type
//! refuses anything else and derives `Ord` from the string.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const WIDTH: usize = 14;

/// A scan acquisition time in the fixed-width `YYYYMMDDHHMMSS` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanTimestamp(String);

impl ScanTimestamp {
    /// Parse from the compact 14 digit form.
    pub fn parse(s: &str) -> Result<Self, TimestampParseError> {
        if s.len() != WIDTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimestampParseError::InvalidFormat(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Parse from a chunk key file segment such as `20250129-150000-001-S`.
    pub fn from_key_segment(segment: &str) -> Result<Self, TimestampParseError> {
        let mut parts = segment.split('-');
        match (parts.next(), parts.next()) {
            (Some(date), Some(time)) if date.len() == 8 && time.len() == 6 => {
                Self::parse(&format!("{}{}", date, time))
            }
            _ => Err(TimestampParseError::InvalidFormat(segment.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `YYYYMMDD-HHMMSS`, the form used in archive file names.
    pub fn file_component(&self) -> String {
        format!("{}-{}", &self.0[0..8], &self.0[8..])
    }

    /// Parse back from a file name component (`YYYYMMDD-HHMMSS`).
    pub fn from_file_component(s: &str) -> Result<Self, TimestampParseError> {
        match s.split_once('-') {
            Some((date, time)) if date.len() == 8 && time.len() == 6 => {
                Self::parse(&format!("{}{}", date, time))
            }
            _ => Err(TimestampParseError::InvalidFormat(s.to_string())),
        }
    }

    /// Interpret as a UTC instant, if the digits form a real calendar time.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, "%Y%m%d%H%M%S")
            .ok()
            .map(|ndt| Utc.from_utc_datetime(&ndt))
    }
}

impl fmt::Display for ScanTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ScanTimestamp {
    type Error = TimestampParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScanTimestamp> for String {
    fn from(ts: ScanTimestamp) -> Self {
        ts.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimestampParseError {
    #[error("Invalid scan timestamp: {0}")]
    InvalidFormat(String),
}
