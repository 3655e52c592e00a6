//! Contract between the simulation driver and animation models.
//!
//! Models own their particle state but not their clock: the driver injects
//! time through [`AnimationModel::set_clock`] before every step.

use crate::grid::Grid;

/// Bottom rows a model keeps for its status line unless told otherwise.
pub const DEFAULT_STATUS_ROWS: usize = 2;

pub trait AnimationModel {
    /// Moves the simulation clock. The driver never moves it backwards within a run.
    fn set_clock(&mut self, t: f64);

    /// Recomputes internal state for the current clock and viewport.
    fn regenerate(&mut self, height: usize, width: usize);

    /// Emits the current visual state without advancing the simulation.
    fn render_content(&self, height: usize, width: usize) -> Grid;
}

/// Everything a model constructor receives.
#[derive(Debug, Clone)]
pub struct ModelSpawn {
    pub color_indices: Vec<u8>,
    /// Replaces `color_indices` when set.
    pub theme_override: Option<Vec<u8>>,
    pub display_name: String,
    /// Spawn-rate multiplier; `None` means the model default.
    pub activity: Option<f64>,
    /// Bottom viewport rows reserved for the status line. Particles stay
    /// above them; with zero rows there is no status line at all.
    pub status_rows: usize,
    pub rng: SimRng,
}

impl ModelSpawn {
    pub fn new(display_name: impl Into<String>, color_indices: Vec<u8>, seed: u64) -> Self {
        Self {
            color_indices,
            theme_override: None,
            display_name: display_name.into(),
            activity: None,
            status_rows: DEFAULT_STATUS_ROWS,
            rng: SimRng::new(seed),
        }
    }

    pub fn colors(&self) -> &[u8] {
        self.theme_override
            .as_deref()
            .filter(|colors| !colors.is_empty())
            .unwrap_or(&self.color_indices)
    }

    pub fn activity(&self) -> f64 {
        self.activity
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(1.0)
    }
}

/// Per-run random source (SplitMix64). Each run builds its own, so runs share
/// no hidden state and replay identically for the same seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        mix64(self.state)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }

    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Uniform in `0..bound`; returns 0 when `bound` is 0.
    pub fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % bound as u64) as usize
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.below(items.len());
        items.get(index)
    }
}

fn mix64(mut value: u64) -> u64 {
    value = (value ^ (value >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    value = (value ^ (value >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    value ^ (value >> 31)
}
