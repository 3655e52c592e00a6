//! Built-in animation classes, looked up by the `class` field of a catalog entry.

mod ripple;
mod starfield;

use anyhow::Result;

use crate::error_codes::{CodedError, UNKNOWN_ANIMATION_CLASS};
use crate::grid::Grid;
use crate::model::{AnimationModel, ModelSpawn};
use crate::style;

pub use ripple::Ripple;
pub use starfield::Starfield;

pub const MODEL_CLASSES: [&str; 2] = ["starfield", "ripple"];

pub fn spawn_model(class: &str, spawn: ModelSpawn) -> Result<Box<dyn AnimationModel>> {
    match class {
        "starfield" => Ok(Box::new(Starfield::new(spawn))),
        "ripple" => Ok(Box::new(Ripple::new(spawn))),
        other => Err(CodedError::usage(
            UNKNOWN_ANIMATION_CLASS,
            format!(
                "unknown animation class '{}'. Supported: {}",
                other,
                MODEL_CLASSES.join(", ")
            ),
        )
        .into()),
    }
}

/// Writes `name` and the clock into the bottom row, as the live terminal
/// status bar would. The compositor never rasterizes the reserved rows, so
/// nothing is written when none are reserved.
fn render_status_line(
    grid: &mut Grid,
    height: usize,
    width: usize,
    status_rows: usize,
    name: &str,
    t: f64,
) {
    if height == 0 || status_rows == 0 {
        return;
    }
    let row = (height - 1) as i64;
    let text = format!(" {name}  t={t:.2}");
    for (col, ch) in text.chars().take(width).enumerate() {
        grid.set(row, col as i64, style::encode(ch, 244, false, true));
    }
}

fn visible_rows(height: usize, status_rows: usize) -> usize {
    height.saturating_sub(status_rows)
}
