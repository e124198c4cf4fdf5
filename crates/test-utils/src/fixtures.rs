//! Common fixtures: chunk keys and a synthetic Archive II builder.

use std::io::Write;

use bzip2::write::BzEncoder;
use bzip2::Compression;

/// Station identifiers used across tests.
pub mod stations {
    pub const KTLX: &str = "KTLX";
    pub const KFWS: &str = "KFWS";
}

/// Build a real-time chunk key: `{station}/{volume}/{date}-{time}-{seq:03}-{marker}`.
///
/// # Example
///
/// ```
/// use test_utils::chunk_key;
///
/// assert_eq!(chunk_key("KTLX", 585, "20250129-150000", 1, 'S'), "KTLX/585/20250129-150000-001-S");
/// ```
pub fn chunk_key(station: &str, volume: u32, timestamp: &str, seq: u32, marker: char) -> String {
    format!("{}/{}/{}-{:03}-{}", station, volume, timestamp, seq, marker)
}

/// Keys for a full scan: one `S`, `intermediate` `I` chunks and one `E`.
pub fn scan_keys(station: &str, volume: u32, timestamp: &str, intermediate: u32) -> Vec<String> {
    let mut keys = vec![chunk_key(station, volume, timestamp, 1, 'S')];
    for seq in 0..intermediate {
        keys.push(chunk_key(station, volume, timestamp, seq + 2, 'I'));
    }
    keys.push(chunk_key(station, volume, timestamp, intermediate + 2, 'E'));
    keys
}

/// Sample generator: `(ray, gate) -> physical value` (`None` = below threshold).
pub type SampleFn = fn(usize, usize) -> Option<f32>;

struct MomentSpec {
    code: &'static str,
    scale: f32,
    offset: f32,
    samples: SampleFn,
}

struct SweepSpec {
    elevation_angle: f32,
    rays: usize,
    gates: usize,
    first_gate_m: u16,
    gate_spacing_m: u16,
    moments: Vec<MomentSpec>,
}

/// Builds small but well-formed Archive II files.
///
/// Every radial is a Message 31 with a volume block and one data block per
/// moment (8-bit words). Radials are packed into bzip2 LDM records.
///
/// # Example
///
/// ```
/// use test_utils::Level2ArchiveBuilder;
///
/// let bytes = Level2ArchiveBuilder::new("KTLX")
///     .sweep(0.5, 8, 10, &[("REF", |_, _| Some(20.0))])
///     .build();
/// assert_eq!(&bytes[0..4], b"AR2V");
/// ```
pub struct Level2ArchiveBuilder {
    station: String,
    latitude: f32,
    longitude: f32,
    site_height: i16,
    feedhorn_height: u16,
    radials_per_record: usize,
    sweeps: Vec<SweepSpec>,
}

impl Level2ArchiveBuilder {
    pub fn new(station: &str) -> Self {
        Self {
            station: station.to_string(),
            latitude: 35.3331,
            longitude: -97.2778,
            site_height: 370,
            feedhorn_height: 20,
            radials_per_record: 120,
            sweeps: Vec::new(),
        }
    }

    pub fn site(mut self, latitude: f32, longitude: f32) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    pub fn radials_per_record(mut self, n: usize) -> Self {
        self.radials_per_record = n.max(1);
        self
    }

    /// Add a sweep. Moments are `(code, samples)` with codes such as `REF`, `VEL`.
    pub fn sweep(
        mut self,
        elevation_angle: f32,
        rays: usize,
        gates: usize,
        moments: &[(&'static str, SampleFn)],
    ) -> Self {
        let moments = moments
            .iter()
            .map(|&(code, samples)| {
                let (scale, offset) = match code {
                    "VEL" => (2.0, 129.0),
                    "RHO" => (300.0, -60.5),
                    _ => (2.0, 66.0),
                };
                MomentSpec {
                    code,
                    scale,
                    offset,
                    samples,
                }
            })
            .collect();

        self.sweeps.push(SweepSpec {
            elevation_angle,
            rays,
            gates,
            first_gate_m: 2125,
            gate_spacing_m: 250,
            moments,
        });
        self
    }

    /// The complete archive.
    pub fn build(&self) -> Vec<u8> {
        self.build_chunks().concat()
    }

    /// The archive split the way the real-time bucket splits it: the first
    /// chunk holds the volume header and first record, each later chunk one
    /// record.
    pub fn build_chunks(&self) -> Vec<Vec<u8>> {
        let radials = self.radial_messages();
        let mut chunks: Vec<Vec<u8>> = radials
            .chunks(self.radials_per_record)
            .map(|batch| ldm_record(&batch.concat()))
            .collect();

        let mut header = self.volume_header();
        if chunks.is_empty() {
            return vec![header];
        }
        header.extend_from_slice(&chunks[0]);
        chunks[0] = header;
        chunks
    }

    fn volume_header(&self) -> Vec<u8> {
        let mut h = b"AR2V0006.001".to_vec();
        h.extend_from_slice(&20_118u32.to_be_bytes());
        h.extend_from_slice(&54_000_000u32.to_be_bytes());
        let mut icao = self.station.as_bytes().to_vec();
        icao.resize(4, b' ');
        h.extend_from_slice(&icao);
        h
    }

    fn radial_messages(&self) -> Vec<Vec<u8>> {
        let mut messages = Vec::new();
        for (sweep_index, sweep) in self.sweeps.iter().enumerate() {
            let width = 360.0 / sweep.rays.max(1) as f32;
            for ray in 0..sweep.rays {
                let status = match ray {
                    0 => 0,
                    r if r + 1 == sweep.rays => 2,
                    _ => 1,
                };
                let body = self.message31_body(
                    sweep,
                    (sweep_index + 1) as u8,
                    (ray + 1) as u16,
                    (ray as f32 + 0.5) * width,
                    status,
                    ray,
                );
                messages.push(frame_message(&body));
            }
        }
        messages
    }

    fn message31_body(
        &self,
        sweep: &SweepSpec,
        elevation_number: u8,
        azimuth_number: u16,
        azimuth: f32,
        status: u8,
        ray: usize,
    ) -> Vec<u8> {
        let block_count = 1 + sweep.moments.len();
        let header_len = 32 + 4 * block_count;

        let mut blocks: Vec<Vec<u8>> = vec![self.volume_block()];
        for moment in &sweep.moments {
            blocks.push(moment_block(sweep, moment, ray));
        }

        let mut body = Vec::with_capacity(header_len + blocks.iter().map(Vec::len).sum::<usize>());
        let mut icao = self.station.as_bytes().to_vec();
        icao.resize(4, b' ');
        body.extend_from_slice(&icao);
        body.extend_from_slice(&54_000_000u32.to_be_bytes());
        body.extend_from_slice(&20_118u16.to_be_bytes());
        body.extend_from_slice(&azimuth_number.to_be_bytes());
        body.extend_from_slice(&azimuth.to_be_bytes());
        body.push(0); // compression
        body.push(0); // spare
        body.extend_from_slice(&0u16.to_be_bytes()); // radial length, patched below
        body.push(1); // azimuth resolution
        body.push(status);
        body.push(elevation_number);
        body.push(1); // cut sector
        body.extend_from_slice(&sweep.elevation_angle.to_be_bytes());
        body.push(0); // spot blanking
        body.push(0); // indexing mode
        body.extend_from_slice(&(block_count as u16).to_be_bytes());

        let mut pointer = header_len as u32;
        for block in &blocks {
            body.extend_from_slice(&pointer.to_be_bytes());
            pointer += block.len() as u32;
        }
        for block in blocks {
            body.extend_from_slice(&block);
        }

        let len = body.len() as u16;
        body[18..20].copy_from_slice(&len.to_be_bytes());
        body
    }

    fn volume_block(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(44);
        block.extend_from_slice(b"RVOL");
        block.extend_from_slice(&44u16.to_be_bytes());
        block.push(1);
        block.push(0);
        block.extend_from_slice(&self.latitude.to_be_bytes());
        block.extend_from_slice(&self.longitude.to_be_bytes());
        block.extend_from_slice(&self.site_height.to_be_bytes());
        block.extend_from_slice(&self.feedhorn_height.to_be_bytes());
        block.resize(44, 0);
        block
    }
}

fn moment_block(sweep: &SweepSpec, moment: &MomentSpec, ray: usize) -> Vec<u8> {
    let mut block = Vec::with_capacity(28 + sweep.gates);
    block.push(b'D');
    let mut name = moment.code.as_bytes().to_vec();
    name.resize(3, b' ');
    block.extend_from_slice(&name);
    block.extend_from_slice(&0u32.to_be_bytes());
    block.extend_from_slice(&(sweep.gates as u16).to_be_bytes());
    block.extend_from_slice(&sweep.first_gate_m.to_be_bytes());
    block.extend_from_slice(&sweep.gate_spacing_m.to_be_bytes());
    block.extend_from_slice(&0u16.to_be_bytes()); // tover
    block.extend_from_slice(&0i16.to_be_bytes()); // snr threshold
    block.push(0); // control flags
    block.push(8); // word size
    block.extend_from_slice(&moment.scale.to_be_bytes());
    block.extend_from_slice(&moment.offset.to_be_bytes());
    for gate in 0..sweep.gates {
        block.push(encode_gate((moment.samples)(ray, gate), moment.scale, moment.offset));
    }
    if block.len() % 2 == 1 {
        block.push(0);
    }
    block
}

fn encode_gate(value: Option<f32>, scale: f32, offset: f32) -> u8 {
    match value {
        None => 0,
        Some(v) => (v * scale + offset).round().clamp(2.0, 255.0) as u8,
    }
}

/// Prefix a Message 31 body with a zeroed CTM header and a message header.
fn frame_message(body: &[u8]) -> Vec<u8> {
    let size_halfwords = ((16 + body.len()) / 2) as u16;
    let mut msg = vec![0u8; 12];
    msg.extend_from_slice(&size_halfwords.to_be_bytes());
    msg.push(0); // channel
    msg.push(31); // message type
    msg.extend_from_slice(&1u16.to_be_bytes()); // sequence
    msg.extend_from_slice(&20_118u16.to_be_bytes());
    msg.extend_from_slice(&54_000_000u32.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes()); // segments
    msg.extend_from_slice(&1u16.to_be_bytes()); // segment number
    msg.extend_from_slice(body);
    msg
}

/// Compress a run of messages into an LDM record with its control word.
fn ldm_record(messages: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(messages)
        .expect("in-memory bzip2 write cannot fail");
    let compressed = encoder
        .finish()
        .expect("in-memory bzip2 finish cannot fail");

    let mut record = (compressed.len() as i32).to_be_bytes().to_vec();
    record.extend_from_slice(&compressed);
    record
}
