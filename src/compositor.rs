//! Rasterizes a captured [`Grid`] into a [`Canvas`].
//!
//! Passes, in order:
//!   1. background fill sized to the visible rows (status-bar rows are never drawn),
//!   2. base glyph pass with dim/bold brightness rules,
//!   3. glow: either offset copies behind bold glyphs, or a blurred glow layer
//!      blended under the base using its luminance as mask, followed by a redraw
//!      of every glyph so text stays crisp,
//!   4. decorations: separator line and the name chip in the bottom-right corner.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use image::imageops;
use serde::{Deserialize, Serialize};

use crate::canvas::{luma, scale_rgb, Canvas, Rect};
use crate::catalog::AnimationDefinition;
use crate::grid::Grid;
use crate::painter::GlyphPainter;
use crate::palette::{PaletteTable, Rgb, UNSTYLED_GRAY};
use crate::simulation::Viewport;
use crate::style::{self, StyledCell};

const OFFSET_GLOW_FACTOR: f32 = 0.3;
const OFFSET_GLOW_TAPS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const BOLD_GLOW_WEIGHT: f32 = 1.0;
const NORMAL_GLOW_WEIGHT: f32 = 0.25;
const GLOW_SIGMA: f32 = 3.0;
const GLOW_MASK_GAIN: u32 = 3;
const SEPARATOR_FACTOR: f32 = 0.35;
const LABEL_TEXT_FACTOR: f32 = 0.8;
const LABEL_CHIP_COLOR: [u8; 4] = [20, 20, 28, 255];
const LABEL_CHIP_RADIUS: u32 = 4;
const LABEL_MARGIN_RIGHT: i32 = 8;
const LABEL_MARGIN_BOTTOM: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlowMode {
    None,
    /// Four one-pixel offset copies at reduced brightness behind bold glyphs.
    Offset,
    /// Gaussian-blurred glow layer under the glyphs.
    #[default]
    Blur,
}

impl GlowMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Offset => "offset",
            Self::Blur => "blur",
        }
    }
}

impl FromStr for GlowMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "offset" => Ok(Self::Offset),
            "blur" => Ok(Self::Blur),
            other => Err(anyhow!("unknown glow mode '{other}', expected none|offset|blur")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorSettings {
    pub cell_width: u32,
    pub cell_height: u32,
    pub status_rows: usize,
    pub background: Rgb,
    /// Brightness multiplier for dim cells, in `0.5..=0.75`.
    pub dim_factor: f32,
    pub glow: GlowMode,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            cell_width: 9,
            cell_height: 16,
            status_rows: 2,
            background: [13, 13, 18],
            dim_factor: 0.5,
            glow: GlowMode::Blur,
        }
    }
}

/// A grid cell resolved to pixel position and final color.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CellDraw {
    x: i32,
    y: i32,
    glyph: char,
    color: Rgb,
    glow_weight: f32,
}

pub struct Compositor {
    palette: Arc<PaletteTable>,
    settings: CompositorSettings,
    painter: GlyphPainter,
    label_painter: GlyphPainter,
}

impl Compositor {
    pub fn new(
        palette: Arc<PaletteTable>,
        settings: CompositorSettings,
        mut painter: GlyphPainter,
        label_painter: GlyphPainter,
    ) -> Self {
        painter.fit_cell(settings.cell_width, settings.cell_height);
        Self {
            palette,
            settings,
            painter,
            label_painter,
        }
    }

    pub fn visible_rows(&self, viewport: Viewport) -> usize {
        viewport.height.saturating_sub(self.settings.status_rows)
    }

    pub fn canvas_size(&self, viewport: Viewport) -> (u32, u32) {
        (
            viewport.width as u32 * self.settings.cell_width,
            self.visible_rows(viewport) as u32 * self.settings.cell_height,
        )
    }

    /// Render color and glow contribution for one decoded cell.
    /// Dim takes precedence over bold: a cell with both flags is dimmed and
    /// casts no glow.
    pub fn cell_appearance(&self, cell: &StyledCell) -> (Rgb, f32) {
        let base = cell.color.resolve(&self.palette);
        if cell.dim {
            (scale_rgb(base, self.settings.dim_factor), 0.0)
        } else if cell.bold {
            (base, BOLD_GLOW_WEIGHT)
        } else {
            (base, NORMAL_GLOW_WEIGHT)
        }
    }

    fn collect_cells(&self, grid: &Grid, viewport: Viewport) -> Vec<CellDraw> {
        let visible_rows = self.visible_rows(viewport);
        grid.cells_sorted()
            .into_iter()
            .filter(|&(row, col, _)| row < visible_rows && col < viewport.width)
            .filter_map(|(row, col, token)| {
                let cell = style::decode(token);
                if cell.glyph == ' ' {
                    return None;
                }
                let (color, glow_weight) = self.cell_appearance(&cell);
                Some(CellDraw {
                    x: (col as u32 * self.settings.cell_width) as i32,
                    y: (row as u32 * self.settings.cell_height) as i32,
                    glyph: cell.glyph,
                    color,
                    glow_weight,
                })
            })
            .collect()
    }

    pub fn composite(
        &mut self,
        grid: &Grid,
        definition: &AnimationDefinition,
        viewport: Viewport,
    ) -> Canvas {
        let (width, height) = self.canvas_size(viewport);
        let mut canvas = Canvas::new(width, height, self.settings.background);
        let cells = self.collect_cells(grid, viewport);

        match self.settings.glow {
            GlowMode::None => self.draw_cells(&mut canvas, &cells),
            GlowMode::Offset => {
                for cell in cells.iter().filter(|cell| cell.glow_weight >= BOLD_GLOW_WEIGHT) {
                    let glow = scale_rgb(cell.color, OFFSET_GLOW_FACTOR);
                    for (dx, dy) in OFFSET_GLOW_TAPS {
                        self.painter.draw_glyph(
                            &mut canvas,
                            cell.x + dx,
                            cell.y + dy,
                            cell.glyph,
                            opaque(glow),
                        );
                    }
                }
                self.draw_cells(&mut canvas, &cells);
            }
            GlowMode::Blur => {
                self.draw_cells(&mut canvas, &cells);
                let glow_layer = self.glow_layer(width, height, &cells);
                apply_glow(&mut canvas, &glow_layer);
                self.draw_cells(&mut canvas, &cells);
            }
        }

        self.decorate(&mut canvas, definition);
        canvas
    }

    fn draw_cells(&mut self, canvas: &mut Canvas, cells: &[CellDraw]) {
        for cell in cells {
            self.painter
                .draw_glyph(canvas, cell.x, cell.y, cell.glyph, opaque(cell.color));
        }
    }

    fn glow_layer(&mut self, width: u32, height: u32, cells: &[CellDraw]) -> Canvas {
        let mut layer = Canvas::new(width, height, [0, 0, 0]);
        for cell in cells.iter().filter(|cell| cell.glow_weight > 0.0) {
            let color = scale_rgb(cell.color, cell.glow_weight);
            self.painter
                .draw_glyph(&mut layer, cell.x, cell.y, cell.glyph, opaque(color));
        }
        let blurred = imageops::blur(&layer.to_image(), GLOW_SIGMA);
        Canvas::from_image(&blurred)
    }

    fn decorate(&mut self, canvas: &mut Canvas, definition: &AnimationDefinition) {
        if canvas.width() == 0 || canvas.height() == 0 {
            return;
        }
        let accent = definition
            .colors()
            .first()
            .map(|&index| self.palette.lookup(u32::from(index)))
            .unwrap_or(UNSTYLED_GRAY);

        canvas.draw_hline(
            canvas.height() - 1,
            opaque(scale_rgb(accent, SEPARATOR_FACTOR)),
        );

        let label = format!("  {}  ", definition.name);
        let (label_w, label_h) = self.label_painter.measure(&label);
        let lx = canvas.width() as i32 - label_w as i32 - LABEL_MARGIN_RIGHT;
        let ly = canvas.height() as i32 - label_h as i32 - LABEL_MARGIN_BOTTOM;
        let chip_x = (lx - 4).max(0);
        let chip_y = (ly - 2).max(0);
        canvas.fill_rounded_rect(
            Rect {
                x: chip_x as u32,
                y: chip_y as u32,
                w: ((lx + label_w as i32 + 4) - chip_x).max(0) as u32,
                h: ((ly + label_h as i32 + 4) - chip_y).max(0) as u32,
            },
            LABEL_CHIP_RADIUS,
            LABEL_CHIP_COLOR,
        );
        self.label_painter.draw_text(
            canvas,
            lx,
            ly,
            &label,
            opaque(scale_rgb(accent, LABEL_TEXT_FACTOR)),
        );
    }
}

fn opaque(color: Rgb) -> [u8; 4] {
    [color[0], color[1], color[2], 255]
}

/// Blends the blurred glow under the base layer. The glow hue is taken at full
/// intensity and its luminance, scaled by a fixed gain, is the blend alpha.
fn apply_glow(canvas: &mut Canvas, glow: &Canvas) {
    let width = canvas.width();
    for (i, glow_px) in glow.pixels().chunks_exact(4).enumerate() {
        let rgb = [glow_px[0], glow_px[1], glow_px[2]];
        let peak = rgb.iter().copied().max().unwrap_or(0);
        if peak == 0 {
            continue;
        }
        let alpha = (u32::from(luma(rgb)).max(1) * GLOW_MASK_GAIN).min(255) as u8;
        let hue = rgb.map(|channel| ((u32::from(channel) * 255) / u32::from(peak)) as u8);
        let x = i as u32 % width;
        let y = i as u32 / width;
        canvas.blend(x, y, [hue[0], hue[1], hue[2], alpha]);
    }
}
