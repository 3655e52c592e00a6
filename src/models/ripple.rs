use crate::grid::Grid;
use crate::model::{AnimationModel, ModelSpawn, SimRng};
use crate::style;

use super::{render_status_line, visible_rows};

const RINGS_PER_UNIT: f64 = 1.6;
const GROWTH_PER_UNIT: f64 = 7.5;
const MAX_RADIUS: f64 = 14.0;
const ECHO_GAP: f64 = 1.5;
// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;

#[derive(Debug, Clone)]
struct Ring {
    center_row: f64,
    center_col: f64,
    born: f64,
    color: u8,
}

/// Rings that appear at seeded positions and grow outwards, with a bold crest
/// followed by a dim echo.
pub struct Ripple {
    name: String,
    colors: Vec<u8>,
    activity: f64,
    status_rows: usize,
    rng: SimRng,
    t: f64,
    last_t: Option<f64>,
    spawn_debt: f64,
    rings: Vec<Ring>,
}

impl Ripple {
    pub fn new(spawn: ModelSpawn) -> Self {
        let colors = spawn.colors().to_vec();
        let activity = spawn.activity();
        Self {
            name: spawn.display_name,
            colors,
            activity,
            status_rows: spawn.status_rows,
            rng: spawn.rng,
            t: 0.0,
            last_t: None,
            spawn_debt: 0.0,
            rings: Vec::new(),
        }
    }

    fn radius(&self, ring: &Ring) -> f64 {
        (self.t - ring.born).max(0.0) * GROWTH_PER_UNIT
    }
}

impl AnimationModel for Ripple {
    fn set_clock(&mut self, t: f64) {
        self.t = t;
    }

    fn regenerate(&mut self, height: usize, width: usize) {
        let rows = visible_rows(height, self.status_rows);
        let dt = match self.last_t {
            Some(last) => (self.t - last).max(0.0),
            None => 0.0,
        };
        self.last_t = Some(self.t);

        let t = self.t;
        self.rings
            .retain(|ring| (t - ring.born) * GROWTH_PER_UNIT <= MAX_RADIUS + ECHO_GAP);

        self.spawn_debt += RINGS_PER_UNIT * self.activity * dt;
        while self.spawn_debt >= 1.0 {
            self.spawn_debt -= 1.0;
            let color = self.rng.pick(&self.colors).copied().unwrap_or(51);
            let center_row = self.rng.range_f64(0.0, rows.max(1) as f64);
            let center_col = self.rng.range_f64(0.0, width.max(1) as f64);
            self.rings.push(Ring {
                center_row,
                center_col,
                born: t,
                color,
            });
        }
    }

    fn render_content(&self, height: usize, width: usize) -> Grid {
        let rows = visible_rows(height, self.status_rows);
        let mut grid = Grid::new();

        for ring in &self.rings {
            let radius = self.radius(ring);
            let fade = radius / MAX_RADIUS;
            let echo = radius - ECHO_GAP;
            if echo > 0.0 {
                plot_ring(&mut grid, ring, echo, rows, width, '.', false, true);
            }
            let crest_bold = fade < 0.6;
            let crest_dim = !crest_bold && fade > 0.9;
            plot_ring(
                &mut grid,
                ring,
                radius,
                rows,
                width,
                'o',
                crest_bold,
                crest_dim,
            );
        }

        render_status_line(
            &mut grid,
            height,
            width,
            self.status_rows,
            &self.name,
            self.t,
        );
        grid
    }
}

fn plot_ring(
    grid: &mut Grid,
    ring: &Ring,
    radius: f64,
    rows: usize,
    width: usize,
    glyph: char,
    bold: bool,
    dim: bool,
) {
    if radius < 0.5 {
        let (row, col) = (
            ring.center_row.round() as i64,
            ring.center_col.round() as i64,
        );
        if row >= 0 && col >= 0 && (row as usize) < rows && (col as usize) < width {
            grid.set(row, col, style::encode(glyph, ring.color, bold, dim));
        }
        return;
    }
    let steps = ((radius * CELL_ASPECT * std::f64::consts::TAU).ceil() as usize).max(8);
    for step in 0..steps {
        let angle = step as f64 / steps as f64 * std::f64::consts::TAU;
        let row = (ring.center_row + radius * angle.sin()).round() as i64;
        let col = (ring.center_col + radius * CELL_ASPECT * angle.cos()).round() as i64;
        if row < 0 || col < 0 || row as usize >= rows || col as usize >= width {
            continue;
        }
        grid.set(row, col, style::encode(glyph, ring.color, bold, dim));
    }
}
