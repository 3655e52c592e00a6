use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::AnimationDefinition;
use crate::compositor::{CompositorSettings, GlowMode};
use crate::encoding::LoopMode;
use crate::error_codes::{CodedError, INVALID_RENDER_CONFIG};
use crate::hashing::fnv1a64;
use crate::palette::{PaletteConvention, Rgb};
use crate::quantize::{MAX_COLORS, MIN_COLORS};
use crate::simulation::{SimulationTiming, Viewport};

/// Longest recording or warm-up accepted, in seconds.
pub const MAX_SECONDS: f64 = 600.0;
pub const MIN_DIM_FACTOR: f32 = 0.5;
pub const MAX_DIM_FACTOR: f32 = 0.75;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Viewport in terminal cells, status-bar rows included.
    pub columns: usize,
    pub rows: usize,
    pub status_rows: usize,
    pub cell_width: u32,
    pub cell_height: u32,
    pub font_size: f32,
    pub label_font_size: f32,
    pub font: Option<PathBuf>,
    pub background: Rgb,
    pub duration: f64,
    pub fps: u32,
    pub sim_rate: u32,
    pub warmup: f64,
    pub max_colors: usize,
    pub seed: u64,
    pub glow: GlowMode,
    pub palette: PaletteConvention,
    pub dim_factor: f32,
    /// Extra plays after the first; absent means loop forever.
    pub loop_count: Option<u16>,
    /// Replaces the built-in catalog when non-empty.
    pub animations: Vec<AnimationDefinition>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            columns: 100,
            rows: 32,
            status_rows: 2,
            cell_width: 9,
            cell_height: 16,
            font_size: 14.0,
            label_font_size: 11.0,
            font: None,
            background: [13, 13, 18],
            duration: 4.0,
            fps: 12,
            sim_rate: 30,
            warmup: 2.0,
            max_colors: 64,
            seed: 42,
            glow: GlowMode::Blur,
            palette: PaletteConvention::Xterm,
            dim_factor: 0.5,
            loop_count: None,
            animations: Vec::new(),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> anyhow::Error {
    CodedError::usage(INVALID_RENDER_CONFIG, message)
        .with_details(json!({ "field": field }))
        .into()
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 {
            return Err(invalid("columns", "columns must be > 0"));
        }
        if self.rows <= self.status_rows {
            return Err(invalid(
                "rows",
                format!(
                    "rows ({}) must exceed status_rows ({})",
                    self.rows, self.status_rows
                ),
            ));
        }
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(invalid(
                "cell_width",
                format!(
                    "cell size must be positive, got {}x{}",
                    self.cell_width, self.cell_height
                ),
            ));
        }
        let (pixel_width, pixel_height) = self.canvas_size();
        if pixel_width > u64::from(u16::MAX) || pixel_height > u64::from(u16::MAX) {
            return Err(invalid(
                "columns",
                format!("canvas {pixel_width}x{pixel_height} exceeds the 65535 px GIF limit"),
            ));
        }
        for (field, value) in [
            ("font_size", self.font_size),
            ("label_font_size", self.label_font_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("{field} must be finite and > 0")));
            }
        }
        for (field, value) in [("duration", self.duration), ("warmup", self.warmup)] {
            if !value.is_finite() || !(0.0..=MAX_SECONDS).contains(&value) {
                return Err(invalid(
                    field,
                    format!("{field} must be within 0..={MAX_SECONDS} seconds, got {value}"),
                ));
            }
        }
        if self.fps == 0 {
            return Err(invalid("fps", "fps must be > 0"));
        }
        if self.sim_rate == 0 {
            return Err(invalid("sim_rate", "sim_rate must be > 0"));
        }
        if !(MIN_COLORS..=MAX_COLORS).contains(&self.max_colors) {
            return Err(invalid(
                "max_colors",
                format!(
                    "max_colors must be within {}..={}, got {}",
                    MIN_COLORS, MAX_COLORS, self.max_colors
                ),
            ));
        }
        if !(MIN_DIM_FACTOR..=MAX_DIM_FACTOR).contains(&self.dim_factor) {
            return Err(invalid(
                "dim_factor",
                format!(
                    "dim_factor must be within {MIN_DIM_FACTOR}..={MAX_DIM_FACTOR}, got {}",
                    self.dim_factor
                ),
            ));
        }
        for (index, animation) in self.animations.iter().enumerate() {
            animation
                .validate()
                .map_err(|error| invalid("animations", format!("animations[{index}]: {error}")))?;
        }
        Ok(())
    }

    fn canvas_size(&self) -> (u64, u64) {
        (
            self.columns as u64 * u64::from(self.cell_width),
            self.rows.saturating_sub(self.status_rows) as u64 * u64::from(self.cell_height),
        )
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            height: self.rows,
            width: self.columns,
        }
    }

    pub fn timing(&self) -> SimulationTiming {
        SimulationTiming {
            sim_rate: self.sim_rate,
            output_fps: self.fps,
            warmup_secs: self.warmup,
            duration_secs: self.duration,
        }
    }

    pub fn compositor_settings(&self) -> CompositorSettings {
        CompositorSettings {
            cell_width: self.cell_width,
            cell_height: self.cell_height,
            status_rows: self.status_rows,
            background: self.background,
            dim_factor: self.dim_factor,
            glow: self.glow,
        }
    }

    pub fn loop_mode(&self) -> LoopMode {
        match self.loop_count {
            Some(count) => LoopMode::Count(count),
            None => LoopMode::Infinite,
        }
    }

    /// Stable hash of every setting, recorded in sidecars.
    pub fn fingerprint(&self) -> Result<u64> {
        let bytes = serde_json::to_vec(self).context("failed to serialize render config")?;
        Ok(fnv1a64(&bytes))
    }
}

/// Values given on the command line; each replaces the config file's value.
#[derive(Debug, Clone, Default)]
pub struct RenderOverrides {
    pub seed: Option<u64>,
    pub fps: Option<u32>,
    pub duration: Option<f64>,
    pub max_colors: Option<usize>,
    pub glow: Option<GlowMode>,
    pub font: Option<PathBuf>,
}

impl RenderOverrides {
    pub fn apply(&self, config: &mut RenderConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(max_colors) = self.max_colors {
            config.max_colors = max_colors;
        }
        if let Some(glow) = self.glow {
            config.glow = glow;
        }
        if let Some(font) = &self.font {
            config.font = Some(font.clone());
        }
    }
}

pub fn parse_render_config(contents: &str, origin: &str) -> Result<RenderConfig> {
    let config: RenderConfig = serde_yaml::from_str(contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow::Error::from(CodedError::usage(
            INVALID_RENDER_CONFIG,
            format!("failed to parse yaml in {origin} at {location}: {error}"),
        ))
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_render_config(path: &Path) -> Result<RenderConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_render_config(&contents, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::{parse_render_config, RenderConfig, RenderOverrides};
    use crate::compositor::GlowMode;
    use crate::encoding::LoopMode;
    use crate::error_codes::{find_coded_error, INVALID_RENDER_CONFIG};
    use crate::palette::PaletteConvention;

    #[test]
    fn defaults_match_reference_settings() {
        let config = RenderConfig::default();
        config.validate().unwrap();
        let timing = config.timing();
        assert_eq!(timing.total_frames(), 48);
        assert_eq!(timing.steps_per_frame(), 3);
        assert_eq!(config.viewport().height, 32);
        assert_eq!(config.loop_mode(), LoopMode::Infinite);
        assert_eq!(config.palette, PaletteConvention::Xterm);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = parse_render_config(
            "fps: 10\nglow: offset\npalette: linear\nloop_count: 3\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.fps, 10);
        assert_eq!(config.glow, GlowMode::Offset);
        assert_eq!(config.palette, PaletteConvention::Linear);
        assert_eq!(config.loop_mode(), LoopMode::Count(3));
        assert_eq!(config.columns, 100);
    }

    #[test]
    fn unknown_field_reports_location() {
        let error = parse_render_config("fps: 12\nframerate: 30\n", "inline").unwrap_err();
        let coded = find_coded_error(&error).unwrap();
        assert_eq!(coded.code, INVALID_RENDER_CONFIG);
        assert!(coded.message.contains("line 2"), "{}", coded.message);
    }

    #[test]
    fn out_of_range_values_are_coded() {
        for yaml in [
            "max_colors: 1\n",
            "max_colors: 300\n",
            "fps: 0\n",
            "rows: 2\n",
            "dim_factor: 0\n",
            "dim_factor: 0.9\n",
            "duration: -1\n",
            "duration: 1e12\n",
            "warmup: 601\n",
            "duration: .nan\n",
            "columns: 9000\n",
        ] {
            let error = parse_render_config(yaml, "inline").unwrap_err();
            let coded = find_coded_error(&error).unwrap_or_else(|| panic!("{yaml}: {error:#}"));
            assert_eq!(coded.code, INVALID_RENDER_CONFIG, "{yaml}");
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        parse_render_config("dim_factor: 0.75\nduration: 600\nwarmup: 0\n", "inline").unwrap();
        parse_render_config("dim_factor: 0.5\nduration: 0\nwarmup: 600\n", "inline").unwrap();
    }

    #[test]
    fn animation_theme_and_activity_parse() {
        let yaml = concat!(
            "animations:\n",
            "  - name: Ember\n",
            "    class: starfield\n",
            "    colors: [208]\n",
            "    theme: [196, 202]\n",
            "    activity: 1.5\n",
        );
        let config = parse_render_config(yaml, "inline").unwrap();
        let animation = &config.animations[0];
        assert_eq!(animation.colors(), &[196, 202]);
        assert_eq!(animation.activity, Some(1.5));

        let error = parse_render_config(
            "animations:\n  - name: Ember\n    class: starfield\n    activity: -1\n",
            "inline",
        )
        .unwrap_err();
        let coded = find_coded_error(&error).unwrap();
        assert_eq!(coded.code, INVALID_RENDER_CONFIG);
        assert_eq!(coded.details.as_ref().unwrap()["field"], "animations");
    }

    #[test]
    fn overrides_replace_values_and_change_fingerprint() {
        let mut config = RenderConfig::default();
        let before = config.fingerprint().unwrap();
        RenderOverrides {
            seed: Some(7),
            glow: Some(GlowMode::None),
            ..RenderOverrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.seed, 7);
        assert_eq!(config.glow, GlowMode::None);
        assert_ne!(config.fingerprint().unwrap(), before);
        assert_eq!(config.fingerprint().unwrap(), config.clone().fingerprint().unwrap());
    }
}
