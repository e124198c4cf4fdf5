//! Message framing and Message 31 radial parsing.

use radar_common::{DecodeError, SiteLocation};

const CTM_HEADER_LEN: usize = 12;
const MESSAGE_HEADER_LEN: usize = 16;
/// Fixed frame size of every message other than type 31.
const LEGACY_FRAME_LEN: usize = 2432;
const GENERIC_RADAR_DATA: u8 = 31;
const MAX_DATA_BLOCKS: usize = 10;

/// Raw code for "below threshold".
const CODE_BELOW_THRESHOLD: u16 = 0;
/// Raw code for "range folded".
const CODE_RANGE_FOLDED: u16 = 1;

/// Map a Message 31 moment name to its field name.
pub fn moment_field_name(moment: &str) -> Option<&'static str> {
    match moment.trim() {
        "REF" => Some("reflectivity"),
        "VEL" => Some("velocity"),
        "SW" => Some("spectrum_width"),
        "ZDR" => Some("differential_reflectivity"),
        "PHI" => Some("differential_phase"),
        "RHO" => Some("cross_correlation_ratio"),
        "CFP" => Some("clutter_filter_power_removed"),
        _ => None,
    }
}

/// One data moment of a radial.
#[derive(Debug, Clone, PartialEq)]
pub struct Moment {
    /// Field name (e.g. `reflectivity`)
    pub field: String,
    /// Range to the centre of the first gate in meters
    pub first_gate_m: f32,
    /// Gate spacing in meters
    pub gate_spacing_m: f32,
    /// Decoded gate values, `None` for masked gates
    pub values: Vec<Option<f32>>,
}

impl Moment {
    /// Range to the centre of the last gate.
    pub fn last_gate_m(&self) -> f32 {
        self.first_gate_m + self.gate_spacing_m * self.values.len().saturating_sub(1) as f32
    }
}

/// A decoded Message 31 radial.
#[derive(Debug, Clone, PartialEq)]
pub struct Radial {
    pub station: String,
    pub azimuth_number: u16,
    pub azimuth: f32,
    pub radial_status: u8,
    pub elevation_number: u8,
    pub elevation_angle: f32,
    /// Present when the radial carries a volume data block
    pub site: Option<SiteLocation>,
    pub moments: Vec<Moment>,
}

/// Parse every Message 31 radial in a decompressed LDM record.
pub(crate) fn parse_record(record: &[u8]) -> Result<Vec<Radial>, DecodeError> {
    let mut radials = Vec::new();
    let mut pos = 0;

    while pos + CTM_HEADER_LEN + MESSAGE_HEADER_LEN <= record.len() {
        let header = pos + CTM_HEADER_LEN;
        let size_halfwords = read_u16(record, header)? as usize;
        let message_type = record[header + 3];

        if message_type == GENERIC_RADAR_DATA {
            let end = header + size_halfwords * 2;
            if size_halfwords * 2 < MESSAGE_HEADER_LEN || end > record.len() {
                return Err(DecodeError::Truncated(pos));
            }
            radials.push(parse_radial(&record[header + MESSAGE_HEADER_LEN..end])?);
            pos = end;
        } else {
            pos += LEGACY_FRAME_LEN;
        }
    }

    Ok(radials)
}

/// Parse a Message 31 body (the bytes after the 16 byte message header).
pub(crate) fn parse_radial(body: &[u8]) -> Result<Radial, DecodeError> {
    let station = String::from_utf8_lossy(read_bytes(body, 0, 4)?)
        .trim()
        .to_string();
    let azimuth_number = read_u16(body, 10)?;
    let azimuth = read_f32(body, 12)?;
    let radial_status = read_u8(body, 21)?;
    let elevation_number = read_u8(body, 22)?;
    let elevation_angle = read_f32(body, 24)?;
    let block_count = (read_u16(body, 30)? as usize).min(MAX_DATA_BLOCKS);

    let mut site = None;
    let mut moments = Vec::new();

    for i in 0..block_count {
        let pointer = read_u32(body, 32 + i * 4)? as usize;
        if pointer == 0 {
            continue;
        }
        let block_type = read_u8(body, pointer)?;
        let name = String::from_utf8_lossy(read_bytes(body, pointer + 1, 3)?).into_owned();

        match (block_type, name.as_str()) {
            (b'R', "VOL") => site = Some(parse_volume_block(body, pointer)?),
            (b'D', moment) => {
                if let Some(field) = moment_field_name(moment) {
                    moments.push(parse_moment_block(body, pointer, field)?);
                }
            }
            _ => {}
        }
    }

    Ok(Radial {
        station,
        azimuth_number,
        azimuth,
        radial_status,
        elevation_number,
        elevation_angle,
        site,
        moments,
    })
}

fn parse_volume_block(body: &[u8], p: usize) -> Result<SiteLocation, DecodeError> {
    let latitude = read_f32(body, p + 8)? as f64;
    let longitude = read_f32(body, p + 12)? as f64;
    let site_height = read_i16(body, p + 16)? as f64;
    let feedhorn_height = read_u16(body, p + 18)? as f64;
    Ok(SiteLocation::new(
        latitude,
        longitude,
        site_height + feedhorn_height,
    ))
}

fn parse_moment_block(body: &[u8], p: usize, field: &str) -> Result<Moment, DecodeError> {
    let gate_count = read_u16(body, p + 8)? as usize;
    let first_gate_m = read_u16(body, p + 10)? as f32;
    let gate_spacing_m = read_u16(body, p + 12)? as f32;
    let word_size = read_u8(body, p + 19)?;
    let scale = read_f32(body, p + 20)?;
    let offset = read_f32(body, p + 24)?;

    let data_start = p + 28;
    let mut values = Vec::with_capacity(gate_count);
    for gate in 0..gate_count {
        let raw = match word_size {
            16 => read_u16(body, data_start + gate * 2)?,
            _ => read_u8(body, data_start + gate)? as u16,
        };
        values.push(decode_gate(raw, scale, offset));
    }

    Ok(Moment {
        field: field.to_string(),
        first_gate_m,
        gate_spacing_m,
        values,
    })
}

fn decode_gate(raw: u16, scale: f32, offset: f32) -> Option<f32> {
    if raw == CODE_BELOW_THRESHOLD || raw == CODE_RANGE_FOLDED {
        return None;
    }
    if scale == 0.0 {
        return Some(raw as f32);
    }
    Some((raw as f32 - offset) / scale)
}

fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    data.get(offset..offset + len)
        .ok_or(DecodeError::Truncated(offset))
}

fn read_u8(data: &[u8], offset: usize) -> Result<u8, DecodeError> {
    data.get(offset).copied().ok_or(DecodeError::Truncated(offset))
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let b = read_bytes(data, offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

fn read_i16(data: &[u8], offset: usize) -> Result<i16, DecodeError> {
    let b = read_bytes(data, offset, 2)?;
    Ok(i16::from_be_bytes([b[0], b[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let b = read_bytes(data, offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_f32(data: &[u8], offset: usize) -> Result<f32, DecodeError> {
    read_u32(data, offset).map(f32::from_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gate_codes() {
        assert_eq!(decode_gate(0, 2.0, 66.0), None);
        assert_eq!(decode_gate(1, 2.0, 66.0), None);
        assert_eq!(decode_gate(86, 2.0, 66.0), Some(10.0));
        assert_eq!(decode_gate(42, 0.0, 0.0), Some(42.0));
    }

    #[test]
    fn test_moment_names() {
        assert_eq!(moment_field_name("REF"), Some("reflectivity"));
        assert_eq!(moment_field_name("SW "), Some("spectrum_width"));
        assert_eq!(moment_field_name("XYZ"), None);
    }

    #[test]
    fn test_short_body_is_truncated() {
        assert!(matches!(
            parse_radial(&[0u8; 20]),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn test_legacy_frames_are_skipped() {
        // Two empty legacy frames, no radials.
        let record = vec![0u8; LEGACY_FRAME_LEN * 2];
        assert!(parse_record(&record).unwrap().is_empty());
    }

    #[test]
    fn test_last_gate_range() {
        let m = Moment {
            field: "reflectivity".to_string(),
            first_gate_m: 2125.0,
            gate_spacing_m: 250.0,
            values: vec![None; 5],
        };
        assert_eq!(m.last_gate_m(), 3125.0);
    }
}
