use crate::error::{FlapError, FlapResult};

/// An opaque sRGB color, one byte per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    /// Rec. 709 relative luminance on the 0..255 scale.
    pub fn luminance(self) -> f64 {
        0.2126 * f64::from(self.0[0]) + 0.7152 * f64::from(self.0[1]) + 0.0722 * f64::from(self.0[2])
    }

    /// Shifts every channel by `delta`, clamping to the valid range.
    pub fn tint(self, delta: f64) -> Rgb {
        fn clamp_channel(v: f64) -> u8 {
            v.round().clamp(0.0, 255.0) as u8
        }
        Rgb([
            clamp_channel(f64::from(self.0[0]) + delta),
            clamp_channel(f64::from(self.0[1]) + delta),
            clamp_channel(f64::from(self.0[2]) + delta),
        ])
    }

    pub fn mix(a: Rgb, b: Rgb, t: f64) -> Rgb {
        fn mix_channel(a: u8, b: u8, t: f64) -> u8 {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        }
        Rgb([
            mix_channel(a.0[0], b.0[0], t),
            mix_channel(a.0[1], b.0[1], t),
            mix_channel(a.0[2], b.0[2], t),
        ])
    }
}

/// One color scheme: the silhouette face color and the surrounding field color.
/// The active scheme alternates on every wave.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    pub face: Rgb,
    pub field: Rgb,
}

impl Palette {
    /// True when the silhouette reads darker than the field.
    pub fn face_is_darker(self) -> bool {
        self.face.luminance() < self.field.luminance()
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Tile edge length in logical pixels.
    pub tile_size_px: u32,
    /// Duration of one tile's flip.
    pub flip_duration_ms: f64,
    /// Time for the diagonal wave to sweep the whole grid.
    pub wave_duration_ms: f64,
    /// Data refresh polling interval.
    pub refresh_interval_ms: u64,
    /// Peak vertical lift while a tile is mid-flip, logical pixels.
    pub lift_px: f64,
    /// Peak pseudo-depth band height while mid-flip, logical pixels.
    pub depth_px: f64,
    /// Device pixel ratio cap.
    pub max_dpr: f64,
    /// Field color painted behind every tile.
    pub background: Rgb,
    pub palettes: Vec<Palette>,
    /// Seed for the board's own randomness (tone noise, flip jitter).
    pub seed: u32,
    /// Coalescing window for resize requests.
    pub resize_debounce_ms: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            tile_size_px: 14,
            flip_duration_ms: 920.0,
            wave_duration_ms: 4200.0,
            refresh_interval_ms: 10_000,
            lift_px: 3.2,
            depth_px: 2.4,
            max_dpr: 2.0,
            background: Rgb([0x07, 0x1a, 0x36]),
            palettes: vec![
                // A: white tree on midnight-blue field.
                Palette {
                    face: Rgb([241, 247, 255]),
                    field: Rgb([13, 34, 72]),
                },
                // B: midnight-blue tree on white field.
                Palette {
                    face: Rgb([10, 30, 66]),
                    field: Rgb([234, 243, 255]),
                },
            ],
            seed: 924_137,
            resize_debounce_ms: 120.0,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> FlapResult<()> {
        if self.tile_size_px == 0 {
            return Err(FlapError::validation("tile_size_px must be > 0"));
        }
        if !(self.flip_duration_ms > 0.0) {
            return Err(FlapError::validation("flip_duration_ms must be > 0"));
        }
        if !(self.wave_duration_ms > 0.0) {
            return Err(FlapError::validation("wave_duration_ms must be > 0"));
        }
        if !(self.max_dpr > 0.0) {
            return Err(FlapError::validation("max_dpr must be > 0"));
        }
        if self.palettes.is_empty() {
            return Err(FlapError::validation("palettes must be non-empty"));
        }
        if self.resize_debounce_ms < 0.0 {
            return Err(FlapError::validation("resize_debounce_ms must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        BoardConfig::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_tile() {
        let cfg = BoardConfig {
            tile_size_px: 0,
            ..BoardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_palettes() {
        let cfg = BoardConfig {
            palettes: vec![],
            ..BoardConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_roundtrip_keeps_palette_count() {
        let cfg = BoardConfig::default();
        let s = serde_json::to_string(&cfg).unwrap();
        let de: BoardConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.palettes.len(), cfg.palettes.len());
        assert_eq!(de.background, cfg.background);
    }

    #[test]
    fn tint_clamps_at_both_ends() {
        assert_eq!(Rgb([250, 250, 250]).tint(20.0), Rgb([255, 255, 255]));
        assert_eq!(Rgb([3, 3, 3]).tint(-20.0), Rgb([0, 0, 0]));
    }
}
