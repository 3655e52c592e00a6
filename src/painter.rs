use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};

use crate::builtin_font_data::{ASCII_END, ASCII_START, BUILTIN_5X7, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::canvas::Canvas;

#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    pub bitmap: Vec<u8>,
}

enum Face {
    Truetype {
        font: Box<Font>,
        layout: Layout,
        glyph_cache: HashMap<fontdue::layout::GlyphRasterConfig, GlyphBitmap>,
    },
    Builtin,
}

/// Draws text into a [`Canvas`], either from a TrueType font or from the
/// built-in 5x7 bitmap font.
pub struct GlyphPainter {
    face: Face,
    font_size: f32,
    /// Largest box a built-in glyph may cover, in pixels.
    cell_limit: Option<(u32, u32)>,
    builtin_cache: HashMap<char, GlyphBitmap>,
    fallback_reason: Option<String>,
}

impl GlyphPainter {
    pub fn from_path(font_path: &Path, font_size: f32) -> Result<Self> {
        let font_bytes = std::fs::read(font_path)
            .with_context(|| format!("failed to read font file {}", font_path.display()))?;
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|error| anyhow!("failed to parse font {}: {error}", font_path.display()))?;
        Ok(Self {
            face: Face::Truetype {
                font: Box::new(font),
                layout: Layout::new(CoordinateSystem::PositiveYDown),
                glyph_cache: HashMap::new(),
            },
            font_size,
            cell_limit: None,
            builtin_cache: HashMap::new(),
            fallback_reason: None,
        })
    }

    pub fn builtin(font_size: f32) -> Self {
        Self {
            face: Face::Builtin,
            font_size,
            cell_limit: None,
            builtin_cache: HashMap::new(),
            fallback_reason: None,
        }
    }

    /// Loads `font_path`, or the built-in font when no path is given or the
    /// file cannot be used. Never fails; see [`Self::fallback_reason`].
    pub fn load_or_builtin(font_path: Option<&Path>, font_size: f32) -> Self {
        let Some(path) = font_path else {
            return Self::builtin(font_size);
        };
        match Self::from_path(path, font_size) {
            Ok(painter) => painter,
            Err(error) => {
                let mut painter = Self::builtin(font_size);
                painter.fallback_reason = Some(format!("{error:#}"));
                painter
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.face, Face::Builtin)
    }

    /// Why a requested font was replaced by the built-in one.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    /// Keeps built-in glyphs inside a `width` x `height` cell by capping
    /// their integer scale.
    pub fn fit_cell(&mut self, width: u32, height: u32) {
        self.cell_limit = Some((width, height));
        self.builtin_cache.clear();
    }

    fn builtin_scale(&self) -> u32 {
        let mut scale = (self.font_size / GLYPH_HEIGHT as f32).floor() as u32;
        if let Some((width, height)) = self.cell_limit {
            scale = scale.min(width / GLYPH_WIDTH).min(height / GLYPH_HEIGHT);
        }
        scale.max(1)
    }

    /// Width and height in pixels of `text` drawn on one line.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match &self.face {
            Face::Truetype { font, .. } => {
                let width = text
                    .chars()
                    .map(|ch| font.metrics(ch, self.font_size).advance_width)
                    .sum::<f32>()
                    .ceil() as u32;
                let height = font
                    .horizontal_line_metrics(self.font_size)
                    .map(|metrics| (metrics.ascent - metrics.descent).ceil() as u32)
                    .unwrap_or(self.font_size.ceil() as u32);
                (width, height)
            }
            Face::Builtin => {
                let scale = self.builtin_scale();
                let count = text.chars().count() as u32;
                let width = (count * (GLYPH_WIDTH + 1) * scale).saturating_sub(scale);
                (width, GLYPH_HEIGHT * scale)
            }
        }
    }

    /// Draws `text` with its line box's top-left corner at `(x, y)`.
    pub fn draw_text(&mut self, canvas: &mut Canvas, x: i32, y: i32, text: &str, color: [u8; 4]) {
        if text.is_empty() {
            return;
        }
        let font_size = self.font_size;
        let scale = self.builtin_scale();

        match &mut self.face {
            Face::Truetype {
                font,
                layout,
                glyph_cache,
            } => {
                layout.reset(&LayoutSettings {
                    x: x as f32,
                    y: y as f32,
                    max_width: None,
                    max_height: None,
                    horizontal_align: fontdue::layout::HorizontalAlign::Left,
                    vertical_align: fontdue::layout::VerticalAlign::Top,
                    line_height: 1.0,
                    wrap_style: fontdue::layout::WrapStyle::Letter,
                    wrap_hard_breaks: false,
                });
                layout.append(&[&**font], &TextStyle::new(text, font_size, 0));

                for glyph in layout.glyphs() {
                    if font.lookup_glyph_index(glyph.parent) == 0 && !glyph.parent.is_whitespace()
                    {
                        let bitmap = self
                            .builtin_cache
                            .entry(glyph.parent)
                            .or_insert_with(|| builtin_glyph(glyph.parent, scale));
                        blend_glyph(canvas, glyph.x.round() as i32, y, bitmap, color);
                        continue;
                    }
                    if glyph.width == 0 || glyph.height == 0 {
                        continue;
                    }
                    let bitmap = glyph_cache.entry(glyph.key).or_insert_with(|| {
                        let (_, bitmap) = font.rasterize_config(glyph.key);
                        GlyphBitmap {
                            width: glyph.width,
                            height: glyph.height,
                            bitmap,
                        }
                    });
                    blend_glyph(
                        canvas,
                        glyph.x.round() as i32,
                        glyph.y.round() as i32,
                        bitmap,
                        color,
                    );
                }
            }
            Face::Builtin => {
                let advance = ((GLYPH_WIDTH + 1) * scale) as i32;
                for (i, ch) in text.chars().enumerate() {
                    if ch == ' ' {
                        continue;
                    }
                    let bitmap = self
                        .builtin_cache
                        .entry(ch)
                        .or_insert_with(|| builtin_glyph(ch, scale));
                    blend_glyph(canvas, x + i as i32 * advance, y, bitmap, color);
                }
            }
        }
    }

    pub fn draw_glyph(&mut self, canvas: &mut Canvas, x: i32, y: i32, glyph: char, color: [u8; 4]) {
        let mut buf = [0_u8; 4];
        self.draw_text(canvas, x, y, glyph.encode_utf8(&mut buf), color);
    }
}

/// Scaled coverage mask for `ch`. Characters outside printable ASCII get a
/// small centred block so they stay visible.
fn builtin_glyph(ch: char, scale: u32) -> GlyphBitmap {
    let rows = u8::try_from(u32::from(ch))
        .ok()
        .filter(|code| (ASCII_START..=ASCII_END).contains(code))
        .map(|code| BUILTIN_5X7[(code - ASCII_START) as usize])
        .unwrap_or([
            0b00000, 0b00000, 0b01110, 0b01110, 0b01110, 0b00000, 0b00000,
        ]);

    let width = (GLYPH_WIDTH * scale) as usize;
    let height = (GLYPH_HEIGHT * scale) as usize;
    let mut bitmap = vec![0_u8; width * height];
    for py in 0..height {
        let row_mask = rows[py / scale as usize];
        for px in 0..width {
            let bit = GLYPH_WIDTH as usize - 1 - px / scale as usize;
            if (row_mask >> bit) & 1 == 1 {
                bitmap[py * width + px] = 255;
            }
        }
    }
    GlyphBitmap {
        width,
        height,
        bitmap,
    }
}

pub fn blend_glyph(canvas: &mut Canvas, x: i32, y: i32, glyph: &GlyphBitmap, color: [u8; 4]) {
    let frame_width = canvas.width() as i32;
    let frame_height = canvas.height() as i32;
    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= frame_height {
            continue;
        }

        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= frame_width {
                continue;
            }

            let mask = glyph.bitmap[row * glyph.width + col];
            if mask == 0 {
                continue;
            }

            let alpha = ((u16::from(mask) * u16::from(color[3])) / 255) as u8;
            canvas.blend(
                px as u32,
                py as u32,
                [color[0], color[1], color[2], alpha],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{builtin_glyph, GlyphPainter};
    use crate::canvas::Canvas;

    #[test]
    fn missing_font_falls_back_to_builtin() {
        let painter =
            GlyphPainter::load_or_builtin(Some(Path::new("/nonexistent/font.ttf")), 14.0);
        assert!(painter.is_builtin());
        assert!(painter
            .fallback_reason()
            .is_some_and(|reason| reason.contains("failed to read font file")));
        assert!(GlyphPainter::load_or_builtin(None, 14.0)
            .fallback_reason()
            .is_none());
    }

    #[test]
    fn builtin_glyph_scales_uniformly() {
        let one = builtin_glyph('A', 1);
        let two = builtin_glyph('A', 2);
        assert_eq!((one.width, one.height), (5, 7));
        assert_eq!((two.width, two.height), (10, 14));
        let lit_one = one.bitmap.iter().filter(|&&v| v > 0).count();
        let lit_two = two.bitmap.iter().filter(|&&v| v > 0).count();
        assert_eq!(lit_two, lit_one * 4);
    }

    #[test]
    fn non_ascii_glyph_draws_a_block() {
        let glyph = builtin_glyph('✦', 1);
        assert!(glyph.bitmap.iter().any(|&v| v > 0));
    }

    #[test]
    fn draws_inside_canvas_only() {
        let mut painter = GlyphPainter::builtin(14.0);
        let mut canvas = Canvas::new(12, 16, [0, 0, 0]);
        painter.draw_glyph(&mut canvas, 0, 0, '#', [255, 0, 0, 255]);
        assert!(canvas.pixels().chunks_exact(4).any(|p| p[0] == 255));
        painter.draw_glyph(&mut canvas, -20, 40, '#', [0, 255, 0, 255]);
        assert!(!canvas.pixels().chunks_exact(4).any(|p| p[1] == 255));
    }

    #[test]
    fn cell_limit_caps_builtin_scale() {
        let mut painter = GlyphPainter::builtin(14.0);
        assert_eq!(painter.measure("#"), (10, 14));
        painter.fit_cell(9, 16);
        assert_eq!(painter.measure("#"), (5, 7));
        painter.fit_cell(12, 16);
        assert_eq!(painter.measure("#"), (10, 14));

        let mut canvas = Canvas::new(18, 16, [0, 0, 0]);
        painter.fit_cell(9, 16);
        painter.draw_glyph(&mut canvas, 0, 0, '#', [255, 0, 0, 255]);
        for y in 0..16 {
            for x in 9..18 {
                assert_eq!(canvas.pixel(x, y), [0, 0, 0], "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn measure_builtin_text() {
        let painter = GlyphPainter::builtin(14.0);
        assert_eq!(painter.measure("ab"), (22, 14));
        assert_eq!(painter.measure(""), (0, 14));
    }
}
