//! 256-entry indexed color table.
//!
//! Indices 0-15 are the base colors, 16-231 a 6x6x6 color cube and 232-255 a
//! 24-step grayscale ramp. Which numeric convention fills the base colors and
//! the cube is chosen once per run via [`PaletteConvention`]; every component
//! of a run shares the same [`PaletteTable`].

use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];

/// Color for a well-formed style token that names no color, or names an
/// index outside `0..=255`.
pub const DEFAULT_FOREGROUND: Rgb = [192, 192, 192];
/// Color for a token that does not parse as a style token at all.
pub const UNSTYLED_GRAY: Rgb = [128, 128, 128];

const XTERM_BASE16: [Rgb; 16] = [
    [0, 0, 0],
    [205, 0, 0],
    [0, 205, 0],
    [205, 205, 0],
    [0, 0, 238],
    [205, 0, 205],
    [0, 205, 205],
    [229, 229, 229],
    [127, 127, 127],
    [255, 0, 0],
    [0, 255, 0],
    [255, 255, 0],
    [92, 92, 255],
    [255, 0, 255],
    [0, 255, 255],
    [255, 255, 255],
];

const LINEAR_BASE16: [Rgb; 16] = [
    [0, 0, 0],
    [128, 0, 0],
    [0, 128, 0],
    [128, 128, 0],
    [0, 0, 128],
    [128, 0, 128],
    [0, 128, 128],
    [192, 192, 192],
    [128, 128, 128],
    [255, 0, 0],
    [0, 255, 0],
    [255, 255, 0],
    [0, 0, 255],
    [255, 0, 255],
    [0, 255, 255],
    [255, 255, 255],
];

const XTERM_CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
const LINEAR_CUBE_LEVELS: [u8; 6] = [0, 51, 102, 153, 204, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteConvention {
    /// xterm intensities for the base colors and cube levels `{0,95,135,175,215,255}`.
    #[default]
    Xterm,
    /// ANSI mid-tone base colors and evenly spaced cube steps of 51.
    Linear,
}

impl PaletteConvention {
    pub fn label(self) -> &'static str {
        match self {
            Self::Xterm => "xterm",
            Self::Linear => "linear",
        }
    }

    fn base16(self) -> &'static [Rgb; 16] {
        match self {
            Self::Xterm => &XTERM_BASE16,
            Self::Linear => &LINEAR_BASE16,
        }
    }

    fn cube_levels(self) -> &'static [u8; 6] {
        match self {
            Self::Xterm => &XTERM_CUBE_LEVELS,
            Self::Linear => &LINEAR_CUBE_LEVELS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteTable {
    entries: [Rgb; 256],
}

impl PaletteTable {
    pub fn build(convention: PaletteConvention) -> Self {
        let mut entries = [[0_u8; 3]; 256];
        entries[..16].copy_from_slice(convention.base16());

        let levels = convention.cube_levels();
        for i in 0..216 {
            let r = i / 36;
            let g = (i % 36) / 6;
            let b = i % 6;
            entries[16 + i] = [levels[r], levels[g], levels[b]];
        }

        for i in 0..24 {
            let v = 8 + (i as u8) * 10;
            entries[232 + i] = [v, v, v];
        }

        Self { entries }
    }

    /// Out-of-range indices resolve to [`DEFAULT_FOREGROUND`].
    pub fn lookup(&self, index: u32) -> Rgb {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.entries.get(index))
            .copied()
            .unwrap_or(DEFAULT_FOREGROUND)
    }

    pub fn entries(&self) -> &[Rgb; 256] {
        &self.entries
    }
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::build(PaletteConvention::default())
    }
}
