//! NEXRAD Archive II decoder.
//!
//! Decodes the subset of the Level II format that the rendering pipeline
//! needs: the volume header, bzip2-compressed LDM records and Message 31
//! ("generic digital radar data") radials. All other message types are
//! skipped.
//!
//! Archives assembled from real-time chunks are plain concatenations of the
//! chunk objects, so the start chunk carries the volume header and every
//! later chunk is a run of LDM records.

mod archive;
mod message;
mod sweeps;

pub use archive::{VolumeHeader, VOLUME_HEADER_LEN};
pub use message::{moment_field_name, Moment, Radial};

use radar_common::{DecodeError, Volume, VolumeDecoder};
use tracing::debug;

/// Archive II decoder.
#[derive(Debug, Clone, Default)]
pub struct Level2Decoder;

impl Level2Decoder {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeDecoder for Level2Decoder {
    fn decode(&self, data: &[u8]) -> Result<Volume, DecodeError> {
        decode_archive(data)
    }
}

/// Decode a complete archive into a volume.
pub fn decode_archive(data: &[u8]) -> Result<Volume, DecodeError> {
    let header = VolumeHeader::parse(data)?;
    let radials = archive::read_radials(data)?;

    debug!(
        station = %header.station,
        radials = radials.len(),
        "Decoded archive radials"
    );

    sweeps::build_volume(&header.station, radials)
}
