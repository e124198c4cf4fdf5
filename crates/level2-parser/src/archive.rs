//! Volume header and LDM record framing.

use std::io::Read;

use bzip2::read::MultiBzDecoder;
use radar_common::DecodeError;
use tracing::warn;

use crate::message::{self, Radial};

/// Length of the Archive II volume header.
pub const VOLUME_HEADER_LEN: usize = 24;

const HEADER_MAGIC: &[u8] = b"AR2V";
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Archive II volume header (24 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeHeader {
    /// Tape filename, e.g. `AR2V0006.`
    pub tape: String,
    /// Extension number
    pub extension: String,
    /// Modified Julian date of the volume start
    pub julian_date: u32,
    /// Milliseconds past midnight
    pub millis: u32,
    /// ICAO identifier
    pub station: String,
}

impl VolumeHeader {
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < VOLUME_HEADER_LEN {
            return Err(DecodeError::Truncated(data.len()));
        }
        if &data[0..4] != HEADER_MAGIC {
            return Err(DecodeError::InvalidHeader(
                "missing AR2V volume header".to_string(),
            ));
        }

        Ok(Self {
            tape: String::from_utf8_lossy(&data[0..9]).into_owned(),
            extension: String::from_utf8_lossy(&data[9..12]).into_owned(),
            julian_date: u32::from_be_bytes([data[12], data[13], data[14], data[15]]),
            millis: u32::from_be_bytes([data[16], data[17], data[18], data[19]]),
            station: String::from_utf8_lossy(&data[20..24])
                .trim_end_matches('\0')
                .trim()
                .to_string(),
        })
    }
}

/// Walk every LDM record after the volume header and collect Message 31 radials.
///
/// A damaged or truncated record after at least one good radial ends the walk
/// (the archive may be an incomplete scan); before any radial it is an error.
pub(crate) fn read_radials(data: &[u8]) -> Result<Vec<Radial>, DecodeError> {
    let mut radials = Vec::new();
    let mut offset = VOLUME_HEADER_LEN;

    while offset + 4 <= data.len() {
        let control = i32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        let size = control.unsigned_abs() as usize;
        let record_start = offset + 4;

        if size == 0 {
            offset = record_start;
            continue;
        }

        let result = if record_start + size > data.len() {
            Err(DecodeError::Truncated(offset))
        } else {
            decompress(&data[record_start..record_start + size], record_start)
                .and_then(|record| message::parse_record(&record))
        };

        match result {
            Ok(mut parsed) => radials.append(&mut parsed),
            Err(e) if !radials.is_empty() => {
                warn!(offset = offset, error = %e, "Stopping at damaged record");
                break;
            }
            Err(e) => return Err(e),
        }

        offset = record_start + size;
    }

    if radials.is_empty() {
        return Err(DecodeError::NoRadials);
    }

    Ok(radials)
}

fn decompress(block: &[u8], offset: usize) -> Result<Vec<u8>, DecodeError> {
    if !block.starts_with(BZIP2_MAGIC) {
        return Ok(block.to_vec());
    }

    let mut out = Vec::with_capacity(block.len() * 8);
    MultiBzDecoder::new(block)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Bzip2 {
            offset,
            message: e.to_string(),
        })?;
    Ok(out)
}
