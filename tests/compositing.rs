use std::sync::Arc;

use stardust_render::canvas::{luma, Canvas};
use stardust_render::catalog::AnimationDefinition;
use stardust_render::compositor::{Compositor, CompositorSettings, GlowMode};
use stardust_render::grid::Grid;
use stardust_render::painter::GlyphPainter;
use stardust_render::palette::PaletteTable;
use stardust_render::simulation::Viewport;
use stardust_render::style::encode;

const RED: u8 = 196;
const BLUE: u8 = 21;
const BACKGROUND: [u8; 3] = [13, 13, 18];
const VIEWPORT: Viewport = Viewport {
    height: 8,
    width: 20,
};

fn compositor(glow: GlowMode) -> Compositor {
    Compositor::new(
        Arc::new(PaletteTable::default()),
        CompositorSettings {
            glow,
            background: BACKGROUND,
            ..CompositorSettings::default()
        },
        GlyphPainter::builtin(14.0),
        GlyphPainter::builtin(11.0),
    )
}

fn definition() -> AnimationDefinition {
    AnimationDefinition::new("Sample", "starfield", &[RED])
}

fn block_pixels(canvas: &Canvas, col: u32, row: u32) -> Vec<[u8; 3]> {
    let mut pixels = Vec::new();
    for y in row * 16..(row + 1) * 16 {
        for x in col * 9..(col + 1) * 9 {
            pixels.push(canvas.pixel(x, y));
        }
    }
    pixels
}

fn average_luma(pixels: &[[u8; 3]]) -> f64 {
    pixels.iter().map(|&p| f64::from(luma(p))).sum::<f64>() / pixels.len() as f64
}

fn styled_grid(blue_dim: bool) -> Grid {
    let mut grid = Grid::new();
    grid.set(0, 0, encode('#', RED, true, false));
    grid.set(1, 1, encode('#', BLUE, false, blue_dim));
    grid
}

#[test]
fn styled_cells_land_in_their_pixel_blocks() {
    for glow in [GlowMode::None, GlowMode::Offset, GlowMode::Blur] {
        let canvas = compositor(glow).composite(&styled_grid(true), &definition(), VIEWPORT);
        assert_eq!((canvas.width(), canvas.height()), (180, 96));

        let red_block = block_pixels(&canvas, 0, 0);
        assert!(
            red_block.iter().any(|p| p[0] > 200 && p[1] < 60 && p[2] < 60),
            "{glow:?}: bold red glyph missing"
        );
        let blue_block = block_pixels(&canvas, 1, 1);
        assert!(
            blue_block.iter().any(|p| p[2] > p[0] + 60 && p[2] > 80),
            "{glow:?}: dim blue glyph missing"
        );
    }
}

#[test]
fn dim_cell_is_darker_than_normal_rendering() {
    for glow in [GlowMode::None, GlowMode::Blur] {
        let mut compositor = compositor(glow);
        let dim = compositor.composite(&styled_grid(true), &definition(), VIEWPORT);
        let normal = compositor.composite(&styled_grid(false), &definition(), VIEWPORT);
        let dim_luma = average_luma(&block_pixels(&dim, 1, 1));
        let normal_luma = average_luma(&block_pixels(&normal, 1, 1));
        assert!(
            dim_luma < normal_luma,
            "{glow:?}: dim {dim_luma} should be below normal {normal_luma}"
        );
    }
}

#[test]
fn bold_glow_bleeds_into_background() {
    // The built-in glyph fitted to a 9x16 cell is 7 px tall, so rows 8 and 9
    // of the cell stay empty unless glow reaches them.
    let gap_pixels = |canvas: &Canvas| {
        (0..9)
            .flat_map(|x| [canvas.pixel(x, 8), canvas.pixel(x, 9)])
            .collect::<Vec<_>>()
    };

    let plain = compositor(GlowMode::None).composite(&styled_grid(true), &definition(), VIEWPORT);
    assert!(gap_pixels(&plain).iter().all(|&p| p == BACKGROUND));

    let glowing =
        compositor(GlowMode::Blur).composite(&styled_grid(true), &definition(), VIEWPORT);
    assert!(
        gap_pixels(&glowing)
            .iter()
            .any(|p| p[0] > BACKGROUND[0] + 10 && p[0] > p[1]),
        "expected a red halo below the bold glyph"
    );
}

#[test]
fn glyphs_stay_inside_their_cells() {
    let mut grid = Grid::new();
    grid.set(0, 0, encode('#', RED, false, false));
    grid.set(0, 19, encode('#', RED, false, false));
    let canvas = compositor(GlowMode::None).composite(&grid, &definition(), VIEWPORT);

    for y in 0..16 {
        assert_eq!(canvas.pixel(9, y), BACKGROUND, "column 9, row {y}");
    }
    let lit = |col: u32| {
        block_pixels(&canvas, col, 0)
            .iter()
            .filter(|&&p| p != BACKGROUND)
            .count()
    };
    assert!(lit(0) > 0);
    // The last column draws the whole glyph rather than a clipped part of it.
    assert_eq!(lit(19), lit(0));
}

#[test]
fn cells_outside_visible_area_are_not_drawn() {
    let empty = Grid::new();
    let mut outside = Grid::new();
    // Row 6 is the first status-bar row, column 20 is one past the last column.
    outside.set(6, 3, encode('#', RED, true, false));
    outside.set(7, 0, encode('#', RED, true, false));
    outside.set(2, 20, encode('#', RED, true, false));
    outside.set(40, 40, encode('#', RED, true, false));

    for glow in [GlowMode::None, GlowMode::Offset, GlowMode::Blur] {
        let mut compositor = compositor(glow);
        let baseline = compositor.composite(&empty, &definition(), VIEWPORT);
        let rendered = compositor.composite(&outside, &definition(), VIEWPORT);
        assert_eq!(baseline.hash(), rendered.hash(), "{glow:?}");
    }
}

#[test]
fn label_and_separator_use_accent_color() {
    let canvas = compositor(GlowMode::None).composite(&Grid::new(), &definition(), VIEWPORT);
    // Separator: accent red darkened.
    let separator = canvas.pixel(0, canvas.height() - 1);
    assert!(separator[0] > separator[1] && separator[0] > BACKGROUND[0]);
    // Chip fill and label text in the bottom-right corner.
    let corner = (canvas.width() - 60..canvas.width())
        .flat_map(|x| (canvas.height() - 24..canvas.height() - 1).map(move |y| (x, y)))
        .map(|(x, y)| canvas.pixel(x, y))
        .collect::<Vec<_>>();
    assert!(corner.contains(&[20, 20, 28]));
    assert!(corner.iter().any(|p| p[0] > 150 && p[1] < 40));
}

#[test]
fn missing_font_still_renders() {
    let painter = GlyphPainter::load_or_builtin(Some(std::path::Path::new("/no/such.ttf")), 14.0);
    assert!(painter.is_builtin());
    let mut compositor = Compositor::new(
        Arc::new(PaletteTable::default()),
        CompositorSettings::default(),
        painter,
        GlyphPainter::builtin(11.0),
    );
    let canvas = compositor.composite(&styled_grid(false), &definition(), VIEWPORT);
    assert!(block_pixels(&canvas, 0, 0).iter().any(|p| p[0] > 200));
}
