use std::collections::VecDeque;

use crate::grid::Grid;
use crate::model::{AnimationModel, ModelSpawn, SimRng};
use crate::style;

use super::{render_status_line, visible_rows};

const STARS_PER_UNIT_PER_100_COLS: f64 = 9.0;
const TRAIL_LEN: usize = 6;
const BACKDROP_DENSITY: f64 = 0.012;
const HEAD_GLYPHS: [char; 3] = ['*', '+', 'x'];

#[derive(Debug, Clone)]
struct Star {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    color: u8,
    glyph: char,
    trail: VecDeque<(i64, i64)>,
}

#[derive(Debug, Clone)]
struct BackdropStar {
    row: usize,
    col: usize,
    phase: f64,
}

/// Stars drifting across the viewport, leaving a dim trail behind a bold head,
/// over a field of faint twinkling backdrop stars.
pub struct Starfield {
    name: String,
    colors: Vec<u8>,
    activity: f64,
    status_rows: usize,
    rng: SimRng,
    t: f64,
    last_t: Option<f64>,
    spawn_debt: f64,
    stars: Vec<Star>,
    backdrop: Vec<BackdropStar>,
    backdrop_size: (usize, usize),
}

impl Starfield {
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
            stars: Vec::new(),
            backdrop: Vec::new(),
            backdrop_size: (0, 0),
        }
    }

    fn rebuild_backdrop(&mut self, rows: usize, width: usize) {
        self.backdrop.clear();
        for row in 0..rows {
            for col in 0..width {
                if self.rng.chance(BACKDROP_DENSITY) {
                    let phase = self.rng.range_f64(0.0, std::f64::consts::TAU);
                    self.backdrop.push(BackdropStar { row, col, phase });
                }
            }
        }
        self.backdrop_size = (rows, width);
    }

    fn spawn_star(&mut self, rows: usize) {
        let color = self.rng.pick(&self.colors).copied().unwrap_or(231);
        let glyph = self.rng.pick(&HEAD_GLYPHS).copied().unwrap_or('*');
        let y = self.rng.range_f64(0.0, rows.max(1) as f64);
        let vx = self.rng.range_f64(8.0, 22.0);
        let vy = self.rng.range_f64(-1.5, 1.5);
        self.stars.push(Star {
            x: -1.0,
            y,
            vx,
            vy,
            color,
            glyph,
            trail: VecDeque::with_capacity(TRAIL_LEN),
        });
    }
}

impl AnimationModel for Starfield {
    fn set_clock(&mut self, t: f64) {
        self.t = t;
    }

    fn regenerate(&mut self, height: usize, width: usize) {
        let rows = visible_rows(height, self.status_rows);
        if self.backdrop_size != (rows, width) {
            self.rebuild_backdrop(rows, width);
        }

        let dt = match self.last_t {
            Some(last) => (self.t - last).max(0.0),
            None => 0.0,
        };
        self.last_t = Some(self.t);

        for star in &mut self.stars {
            let cell = (star.y.round() as i64, star.x.round() as i64);
            if star.trail.front() != Some(&cell) {
                star.trail.push_front(cell);
                star.trail.truncate(TRAIL_LEN);
            }
            star.x += star.vx * dt;
            star.y += star.vy * dt;
        }
        let max_x = width as f64 + TRAIL_LEN as f64;
        let max_y = rows as f64;
        self.stars
            .retain(|star| star.x < max_x && star.y > -1.0 && star.y < max_y + 1.0);

        let rate = STARS_PER_UNIT_PER_100_COLS * self.activity * (rows as f64 / 30.0).max(0.1);
        self.spawn_debt += rate * dt;
        while self.spawn_debt >= 1.0 {
            self.spawn_debt -= 1.0;
            self.spawn_star(rows);
        }
    }

    fn render_content(&self, height: usize, width: usize) -> Grid {
        let rows = visible_rows(height, self.status_rows);
        let mut grid = Grid::new();

        for star in &self.backdrop {
            if star.row >= rows || star.col >= width {
                continue;
            }
            let glow = (self.t * 2.1 + star.phase).sin();
            let token = if glow > 0.85 {
                style::encode('+', 250, true, false)
            } else {
                style::encode('.', 240, false, true)
            };
            grid.set(star.row as i64, star.col as i64, token);
        }

        for star in &self.stars {
            for &(row, col) in star.trail.iter().rev() {
                if in_view(row, col, rows, width) {
                    grid.set(row, col, style::encode('.', star.color, false, true));
                }
            }
            let (row, col) = (star.y.round() as i64, star.x.round() as i64);
            if in_view(row, col, rows, width) {
                grid.set(row, col, style::encode(star.glyph, star.color, true, false));
            }
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

fn in_view(row: i64, col: i64, rows: usize, width: usize) -> bool {
    row >= 0 && col >= 0 && (row as usize) < rows && (col as usize) < width
}
