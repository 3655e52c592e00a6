//! Decoding of per-cell style tokens.
//!
//! A token is `ESC [ <codes> m <glyph>` where `<codes>` is a semicolon
//! separated list. `1` sets bold, `2` sets dim and `38;5;<n>` selects palette
//! index `n`. Anything else is ignored. Tokens that do not match this shape
//! decode to an unstyled cell instead of failing.

use std::sync::OnceLock;

use regex::Regex;

use crate::palette::{PaletteTable, Rgb, DEFAULT_FOREGROUND, UNSTYLED_GRAY};

const CODE_BOLD: u32 = 1;
const CODE_DIM: u32 = 2;
const CODE_EXTENDED_FG: u32 = 38;
const EXTENDED_MODE_INDEXED: u32 = 5;

static STYLE_TOKEN: OnceLock<Regex> = OnceLock::new();

fn style_token_regex() -> &'static Regex {
    STYLE_TOKEN.get_or_init(|| {
        Regex::new(r"^\x1b\[([0-9;]*)m(?s)(.)").expect("style token pattern is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellColor {
    /// Palette index as written in the token; may exceed 255.
    Indexed(u32),
    /// Well-formed token without a color selection.
    Default,
    /// Token that did not parse.
    Unstyled,
}

impl CellColor {
    pub fn resolve(self, palette: &PaletteTable) -> Rgb {
        match self {
            Self::Indexed(index) => palette.lookup(index),
            Self::Default => DEFAULT_FOREGROUND,
            Self::Unstyled => UNSTYLED_GRAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledCell {
    pub glyph: char,
    pub color: CellColor,
    pub bold: bool,
    pub dim: bool,
}

impl StyledCell {
    pub fn unstyled(raw: &str) -> Self {
        Self {
            glyph: raw.chars().next().unwrap_or(' '),
            color: CellColor::Unstyled,
            bold: false,
            dim: false,
        }
    }
}

pub fn decode(encoded: &str) -> StyledCell {
    let Some(captures) = style_token_regex().captures(encoded) else {
        return StyledCell::unstyled(encoded);
    };

    let glyph = captures
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .unwrap_or(' ');
    let codes = captures
        .get(1)
        .map(|m| parse_codes(m.as_str()))
        .unwrap_or_default();

    let mut cell = StyledCell {
        glyph,
        color: CellColor::Default,
        bold: false,
        dim: false,
    };

    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            CODE_BOLD => cell.bold = true,
            CODE_DIM => cell.dim = true,
            CODE_EXTENDED_FG
                if i + 2 < codes.len() && codes[i + 1] == EXTENDED_MODE_INDEXED =>
            {
                cell.color = CellColor::Indexed(codes[i + 2]);
                i += 2;
            }
            _ => {}
        }
        i += 1;
    }

    cell
}

/// Builds the token [`decode`] understands.
pub fn encode(glyph: char, color_index: u8, bold: bool, dim: bool) -> String {
    let mut codes = Vec::with_capacity(3);
    if bold {
        codes.push(CODE_BOLD.to_string());
    }
    if dim {
        codes.push(CODE_DIM.to_string());
    }
    codes.push(format!("{CODE_EXTENDED_FG};{EXTENDED_MODE_INDEXED};{color_index}"));
    format!("\x1b[{}m{glyph}", codes.join(";"))
}

fn parse_codes(raw: &str) -> Vec<u32> {
    raw.split(';')
        .filter(|code| !code.is_empty())
        // Digits only by construction; overlong values saturate so they stay
        // unrecognized codes or out-of-range indices.
        .map(|code| code.parse::<u32>().unwrap_or(u32::MAX))
        .collect()
}
