//! Fixed-rate simulation driver.
//!
//! A run has two phases. Warm-up advances the model for
//! `ceil(warmup_secs * sim_rate)` steps and throws every grid away. Recording
//! then emits `total_frames()` grids, advancing `steps_per_frame()` internal
//! steps per output frame and keeping only the last grid of each block.
//! Every internal step calls `set_clock`, `regenerate` and `render_content`
//! exactly once, in order.

use anyhow::{bail, Result};

use crate::grid::Grid;
use crate::model::AnimationModel;

// Guards ceil/round against products like 2.0 * 30.0 landing a hair above an integer.
const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Rows, including the status-bar rows.
    pub height: usize,
    pub width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationTiming {
    /// Internal steps per time unit.
    pub sim_rate: u32,
    /// Emitted frames per time unit.
    pub output_fps: u32,
    pub warmup_secs: f64,
    pub duration_secs: f64,
}

impl SimulationTiming {
    pub fn validate(&self) -> Result<()> {
        if self.sim_rate == 0 {
            bail!("sim_rate must be > 0");
        }
        if self.output_fps == 0 {
            bail!("fps must be > 0");
        }
        if !self.warmup_secs.is_finite() || self.warmup_secs < 0.0 {
            bail!(
                "warmup must be a finite value >= 0, got {}",
                self.warmup_secs
            );
        }
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            bail!(
                "duration must be a finite value >= 0, got {}",
                self.duration_secs
            );
        }
        Ok(())
    }

    pub fn warmup_steps(&self) -> u64 {
        let exact = self.warmup_secs * f64::from(self.sim_rate);
        (exact - STEP_EPSILON).ceil().max(0.0) as u64
    }

    /// `max(1, round(output_step / sim_step))`, ties rounding away from zero,
    /// so 30 Hz at 12 fps advances 3 steps per frame.
    pub fn steps_per_frame(&self) -> u64 {
        let ratio = f64::from(self.sim_rate) / f64::from(self.output_fps);
        (ratio + STEP_EPSILON).round().max(1.0) as u64
    }

    /// `round(duration * fps)`, but at least one frame for any positive duration.
    pub fn total_frames(&self) -> usize {
        if self.duration_secs <= 0.0 {
            return 0;
        }
        let exact = self.duration_secs * f64::from(self.output_fps);
        (exact + STEP_EPSILON).round().max(1.0) as usize
    }

    pub fn frame_duration_ms(&self) -> u32 {
        1000 / self.output_fps.max(1)
    }

    pub fn total_steps(&self) -> u64 {
        self.warmup_steps() + self.steps_per_frame() * self.total_frames() as u64
    }
}

pub struct SimulationDriver<'a> {
    model: &'a mut dyn AnimationModel,
    timing: SimulationTiming,
    viewport: Viewport,
    step: u64,
}

impl<'a> SimulationDriver<'a> {
    pub fn new(
        model: &'a mut dyn AnimationModel,
        timing: SimulationTiming,
        viewport: Viewport,
    ) -> Result<Self> {
        timing.validate()?;
        if viewport.height == 0 || viewport.width == 0 {
            bail!(
                "viewport must be non-empty, got {}x{}",
                viewport.width,
                viewport.height
            );
        }
        Ok(Self {
            model,
            timing,
            viewport,
            step: 0,
        })
    }

    pub fn steps_taken(&self) -> u64 {
        self.step
    }

    fn advance(&mut self) -> Grid {
        self.step += 1;
        // Derived from the step counter so the clock never accumulates float drift.
        let t = self.step as f64 / f64::from(self.timing.sim_rate);
        self.model.set_clock(t);
        self.model.regenerate(self.viewport.height, self.viewport.width);
        self.model.render_content(self.viewport.height, self.viewport.width)
    }

    pub fn warm_up(&mut self) {
        for _ in 0..self.timing.warmup_steps() {
            let _ = self.advance();
        }
    }

    /// Runs the recording phase, handing each captured grid to `on_frame`
    /// together with its frame index. Returns the number of frames captured.
    pub fn record<F>(&mut self, mut on_frame: F) -> Result<usize>
    where
        F: FnMut(usize, Grid) -> Result<()>,
    {
        let frames = self.timing.total_frames();
        let steps_per_frame = self.timing.steps_per_frame();
        for frame_index in 0..frames {
            let mut captured = self.advance();
            for _ in 1..steps_per_frame {
                captured = self.advance();
            }
            on_frame(frame_index, captured)?;
        }
        Ok(frames)
    }

    /// Warm-up followed by recording.
    pub fn run<F>(&mut self, on_frame: F) -> Result<usize>
    where
        F: FnMut(usize, Grid) -> Result<()>,
    {
        self.warm_up();
        self.record(on_frame)
    }
}

/// Convenience wrapper collecting every captured grid.
pub fn capture_grids(
    model: &mut dyn AnimationModel,
    timing: SimulationTiming,
    viewport: Viewport,
) -> Result<Vec<Grid>> {
    let mut grids = Vec::with_capacity(timing.total_frames());
    let mut driver = SimulationDriver::new(model, timing, viewport)?;
    driver.run(|_, grid| {
        grids.push(grid);
        Ok(())
    })?;
    Ok(grids)
}
