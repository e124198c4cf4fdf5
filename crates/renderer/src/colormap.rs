//! Named colormaps.
//!
//! Each colormap is a small table of evenly spaced stops; values between
//! stops are linearly interpolated.

use radar_common::style::DEFAULT_COLORMAP;
use radar_common::{FieldStyle, Rgb};
use tracing::debug;

/// A named colour ramp over `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Colormap {
    pub name: &'static str,
    stops: &'static [Rgb],
}

const NWS_REF: &[Rgb] = &[
    Rgb::new(0x64, 0x64, 0x64),
    Rgb::new(0x00, 0xec, 0xec),
    Rgb::new(0x01, 0xa0, 0xf6),
    Rgb::new(0x00, 0x00, 0xf6),
    Rgb::new(0x00, 0xff, 0x00),
    Rgb::new(0x00, 0xc8, 0x00),
    Rgb::new(0x00, 0x90, 0x00),
    Rgb::new(0xff, 0xff, 0x00),
    Rgb::new(0xe7, 0xc0, 0x00),
    Rgb::new(0xff, 0x90, 0x00),
    Rgb::new(0xff, 0x00, 0x00),
    Rgb::new(0xd6, 0x00, 0x00),
    Rgb::new(0xc0, 0x00, 0x00),
    Rgb::new(0xff, 0x00, 0xff),
    Rgb::new(0x99, 0x55, 0xc9),
    Rgb::new(0xff, 0xff, 0xff),
];

const NWS_VEL: &[Rgb] = &[
    Rgb::new(0x02, 0xfc, 0x02),
    Rgb::new(0x01, 0xe4, 0x01),
    Rgb::new(0x01, 0xc5, 0x01),
    Rgb::new(0x07, 0xac, 0x04),
    Rgb::new(0x06, 0x8f, 0x03),
    Rgb::new(0x04, 0x72, 0x02),
    Rgb::new(0x7c, 0x97, 0x7b),
    Rgb::new(0x98, 0x77, 0x77),
    Rgb::new(0x89, 0x00, 0x00),
    Rgb::new(0xa2, 0x00, 0x00),
    Rgb::new(0xb9, 0x00, 0x00),
    Rgb::new(0xd8, 0x00, 0x00),
    Rgb::new(0xef, 0x00, 0x00),
    Rgb::new(0xfe, 0x00, 0x00),
];

const NWS_SPW: &[Rgb] = &[
    Rgb::new(0x8c, 0x8c, 0x8c),
    Rgb::new(0x00, 0xbb, 0x00),
    Rgb::new(0xff, 0x00, 0x00),
    Rgb::new(0xd0, 0x70, 0x00),
    Rgb::new(0xff, 0xff, 0x00),
];

const REF_DIFF: &[Rgb] = &[
    Rgb::new(0x3f, 0x3f, 0x3f),
    Rgb::new(0x8b, 0x00, 0xd4),
    Rgb::new(0x00, 0x00, 0xff),
    Rgb::new(0x00, 0xc0, 0xff),
    Rgb::new(0x00, 0xff, 0x00),
    Rgb::new(0xff, 0xff, 0x00),
    Rgb::new(0xff, 0x80, 0x00),
    Rgb::new(0xff, 0x00, 0x00),
    Rgb::new(0xff, 0xc0, 0xcb),
];

const WILD25: &[Rgb] = &[
    Rgb::new(0x22, 0x00, 0x40),
    Rgb::new(0x40, 0x00, 0xc0),
    Rgb::new(0x00, 0x80, 0xff),
    Rgb::new(0x00, 0xe0, 0xa0),
    Rgb::new(0x80, 0xff, 0x00),
    Rgb::new(0xff, 0xd0, 0x00),
    Rgb::new(0xff, 0x40, 0x00),
    Rgb::new(0xc0, 0x00, 0x40),
];

const VIRIDIS: &[Rgb] = &[
    Rgb::new(0x44, 0x01, 0x54),
    Rgb::new(0x48, 0x28, 0x78),
    Rgb::new(0x3e, 0x4a, 0x89),
    Rgb::new(0x31, 0x68, 0x8e),
    Rgb::new(0x26, 0x82, 0x8e),
    Rgb::new(0x1f, 0x9e, 0x89),
    Rgb::new(0x35, 0xb7, 0x79),
    Rgb::new(0x6e, 0xce, 0x58),
    Rgb::new(0xb5, 0xde, 0x2b),
    Rgb::new(0xfd, 0xe7, 0x25),
];

const COLORMAPS: &[Colormap] = &[
    Colormap { name: "NWSRef", stops: NWS_REF },
    Colormap { name: "NWSVel", stops: NWS_VEL },
    Colormap { name: "NWS_SPW", stops: NWS_SPW },
    Colormap { name: "RefDiff", stops: REF_DIFF },
    Colormap { name: "Wild25", stops: WILD25 },
    Colormap { name: "viridis", stops: VIRIDIS },
];

impl Colormap {
    /// Look up a colormap by name.
    pub fn by_name(name: &str) -> Option<&'static Colormap> {
        COLORMAPS.iter().find(|c| c.name == name)
    }

    /// Look up a colormap, falling back to the default one.
    pub fn by_name_or_default(name: &str) -> &'static Colormap {
        Self::by_name(name).unwrap_or_else(|| {
            debug!(colormap = %name, "Unknown colormap, using default");
            Self::default_map()
        })
    }

    fn default_map() -> &'static Colormap {
        // The default name is always present in the table above.
        COLORMAPS
            .iter()
            .find(|c| c.name == DEFAULT_COLORMAP)
            .unwrap_or(&COLORMAPS[COLORMAPS.len() - 1])
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        COLORMAPS.iter().map(|c| c.name)
    }

    /// Colour at position `t` in `[0, 1]` (clamped).
    pub fn sample(&self, t: f64) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let segments = self.stops.len() - 1;
        if segments == 0 {
            return self.stops[0];
        }

        let scaled = t * segments as f64;
        let index = (scaled.floor() as usize).min(segments - 1);
        self.stops[index].lerp(&self.stops[index + 1], scaled - index as f64)
    }
}

/// Hex colour of `value` under `style`: clamp-normalize into the style's
/// range, then sample its colormap.
pub fn color_for(style: &FieldStyle, value: f64) -> String {
    Colormap::by_name_or_default(&style.colormap)
        .sample(style.normalize(value))
        .to_hex()
}
