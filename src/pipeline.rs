//! Drives each catalog animation through simulation, compositing, quantization
//! and encoding, and writes the artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::canvas::Canvas;
use crate::catalog::{AnimationDefinition, Catalog};
use crate::compositor::Compositor;
use crate::config::RenderConfig;
use crate::encoding::{delay_centiseconds, encode_sequence, encode_single, write_artifact};
use crate::error_codes::{CodedError, EMPTY_FRAME_SEQUENCE};
use crate::grid::Grid;
use crate::hashing::{hex, sequence_hash};
use crate::model::ModelSpawn;
use crate::models::spawn_model;
use crate::painter::GlyphPainter;
use crate::palette::PaletteTable;
use crate::quantize::quantize;
use crate::simulation::SimulationDriver;

const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Animated GIF of the whole recording.
    Sequence,
    /// PNG of the last recorded frame.
    Still,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Sequence => "gif",
            Self::Still => "png",
        }
    }
}

/// Progress lines go to stdout unless quiet; errors always go to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    pub quiet: bool,
}

impl Reporter {
    pub fn progress(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("[stardust] {}", message.as_ref());
        }
    }

    pub fn error(&self, message: impl AsRef<str>) {
        eprintln!("[stardust] error: {}", message.as_ref());
    }
}

#[derive(Debug, Clone)]
pub struct SequenceRender {
    pub bytes: Vec<u8>,
    pub frame_hashes: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceSidecar {
    pub name: String,
    pub slug: String,
    pub config_fingerprint: String,
    pub frame_count: usize,
    pub frame_duration_ms: u32,
    pub delay_centiseconds: u16,
    pub frame_hashes: Vec<String>,
    pub sequence_hash: String,
}

#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub frames: usize,
    pub bytes: usize,
    pub sidecar: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub artifacts: Vec<RenderedArtifact>,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl SweepReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct RenderPipeline {
    config: RenderConfig,
    compositor: Compositor,
    reporter: Reporter,
}

impl RenderPipeline {
    pub fn new(config: RenderConfig, reporter: Reporter) -> Result<Self> {
        config.validate()?;
        let palette = Arc::new(PaletteTable::build(config.palette));
        let painter = GlyphPainter::load_or_builtin(config.font.as_deref(), config.font_size);
        if let Some(reason) = painter.fallback_reason() {
            reporter.progress(format!("using built-in font: {reason}"));
        }
        let label_painter =
            GlyphPainter::load_or_builtin(config.font.as_deref(), config.label_font_size);
        let compositor = Compositor::new(
            palette,
            config.compositor_settings(),
            painter,
            label_painter,
        );
        Ok(Self {
            config,
            compositor,
            reporter,
        })
    }

    /// Runs warm-up and recording for `definition`, handing every composited
    /// canvas to `on_canvas`. Returns the number of frames recorded.
    pub fn capture<F>(
        &mut self,
        definition: &AnimationDefinition,
        mut on_canvas: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, Canvas) -> Result<()>,
    {
        let viewport = self.config.viewport();
        let compositor = &mut self.compositor;
        simulate(&self.config, self.reporter, definition, |frame_index, grid| {
            let canvas = compositor.composite(&grid, definition, viewport);
            on_canvas(frame_index, canvas)
        })
    }

    pub fn render_sequence(&mut self, definition: &AnimationDefinition) -> Result<SequenceRender> {
        let max_colors = self.config.max_colors;
        let mut frames = Vec::new();
        let mut frame_hashes = Vec::new();
        self.capture(definition, |frame_index, canvas| {
            frame_hashes.push(canvas.hash());
            let indexed = quantize(&canvas, max_colors)
                .with_context(|| format!("failed to quantize frame {frame_index}"))?;
            frames.push(indexed);
            Ok(())
        })?;
        let bytes = encode_sequence(
            &frames,
            self.config.timing().frame_duration_ms(),
            self.config.loop_mode(),
        )?;
        Ok(SequenceRender {
            bytes,
            frame_hashes,
        })
    }

    /// Last recorded instant as a full-color canvas. Only that grid is
    /// composited.
    pub fn render_still_canvas(&mut self, definition: &AnimationDefinition) -> Result<Canvas> {
        let mut last = None;
        simulate(&self.config, self.reporter, definition, |_, grid| {
            last = Some(grid);
            Ok(())
        })?;
        let grid = last.ok_or_else(|| {
            anyhow::Error::from(
                CodedError::run(
                    EMPTY_FRAME_SEQUENCE,
                    format!(
                        "'{}' recorded no frames to capture a still from",
                        definition.name
                    ),
                )
                .with_details(json!({ "duration": self.config.duration })),
            )
        })?;
        let viewport = self.config.viewport();
        Ok(self.compositor.composite(&grid, definition, viewport))
    }

    pub fn sidecar(
        &self,
        definition: &AnimationDefinition,
        render: &SequenceRender,
    ) -> Result<SequenceSidecar> {
        let frame_duration_ms = self.config.timing().frame_duration_ms();
        Ok(SequenceSidecar {
            name: definition.name.clone(),
            slug: definition.slug(),
            config_fingerprint: hex(self.config.fingerprint()?),
            frame_count: render.frame_hashes.len(),
            frame_duration_ms,
            delay_centiseconds: delay_centiseconds(frame_duration_ms),
            frame_hashes: render.frame_hashes.iter().copied().map(hex).collect(),
            sequence_hash: hex(sequence_hash(&render.frame_hashes)),
        })
    }

    pub fn render_to(
        &mut self,
        definition: &AnimationDefinition,
        out_dir: &Path,
        kind: OutputKind,
        write_sidecar: bool,
    ) -> Result<RenderedArtifact> {
        let path = out_dir.join(format!("{}.{}", definition.slug(), kind.extension()));
        match kind {
            OutputKind::Sequence => {
                let render = self.render_sequence(definition)?;
                write_artifact(&path, &render.bytes)?;
                // Written after the GIF so a sidecar never describes a missing artifact.
                let sidecar = if write_sidecar {
                    let sidecar_path = out_dir.join(format!("{}.json", definition.slug()));
                    let document = self.sidecar(definition, &render)?;
                    let json = serde_json::to_vec_pretty(&document)
                        .context("failed to serialize sidecar")?;
                    write_artifact(&sidecar_path, &json)?;
                    Some(sidecar_path)
                } else {
                    None
                };
                Ok(RenderedArtifact {
                    name: definition.name.clone(),
                    path,
                    frames: render.frame_hashes.len(),
                    bytes: render.bytes.len(),
                    sidecar,
                })
            }
            OutputKind::Still => {
                let canvas = self.render_still_canvas(definition)?;
                let bytes = encode_single(&canvas)?;
                write_artifact(&path, &bytes)?;
                Ok(RenderedArtifact {
                    name: definition.name.clone(),
                    path,
                    frames: 1,
                    bytes: bytes.len(),
                    sidecar: None,
                })
            }
        }
    }

    /// Renders every animation in `catalog`. A failed animation is logged and
    /// recorded; the sweep moves on to the next one.
    pub fn render_catalog(
        &mut self,
        catalog: &Catalog,
        out_dir: &Path,
        kind: OutputKind,
        write_sidecar: bool,
    ) -> Result<SweepReport> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

        let mut report = SweepReport::default();
        for definition in catalog.animations() {
            self.reporter.progress(format!("Rendering {}...", definition.name));
            match self.render_to(definition, out_dir, kind, write_sidecar) {
                Ok(artifact) => {
                    self.reporter.progress(format!(
                        "  Saved {} ({:.0} KB, {} frames)",
                        artifact.path.display(),
                        artifact.bytes as f64 / 1024.0,
                        artifact.frames
                    ));
                    report.artifacts.push(artifact);
                }
                Err(error) => {
                    self.reporter
                        .error(format!("{} failed: {error:#}", definition.name));
                    report.failures.push((definition.name.clone(), error));
                }
            }
        }
        Ok(report)
    }
}

/// Spawns the model for `definition` and drives it through warm-up and
/// recording, handing each captured grid to `on_grid`.
fn simulate<F>(
    config: &RenderConfig,
    reporter: Reporter,
    definition: &AnimationDefinition,
    mut on_grid: F,
) -> Result<usize>
where
    F: FnMut(usize, Grid) -> Result<()>,
{
    let mut spawn = ModelSpawn::new(
        definition.name.clone(),
        definition.colors.clone(),
        config.seed,
    );
    spawn.theme_override = definition.theme.clone();
    spawn.activity = definition.activity;
    spawn.status_rows = config.status_rows;
    let mut model = spawn_model(&definition.class, spawn)?;
    let timing = config.timing();
    let total_frames = timing.total_frames();

    let mut driver = SimulationDriver::new(model.as_mut(), timing, config.viewport())?;
    driver.warm_up();
    driver.record(|frame_index, grid| {
        on_grid(frame_index, grid)?;
        if (frame_index + 1) % PROGRESS_EVERY == 0 {
            reporter.progress(format!("  frame {}/{}", frame_index + 1, total_frames));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::{OutputKind, RenderPipeline, Reporter};
    use crate::catalog::{AnimationDefinition, Catalog};
    use crate::config::RenderConfig;
    use crate::error_codes::{find_coded_error, EMPTY_FRAME_SEQUENCE, UNKNOWN_ANIMATION_CLASS};

    fn small_config() -> RenderConfig {
        RenderConfig {
            columns: 24,
            rows: 10,
            duration: 0.5,
            warmup: 0.5,
            max_colors: 16,
            ..RenderConfig::default()
        }
    }

    fn quiet() -> Reporter {
        Reporter { quiet: true }
    }

    #[test]
    fn sequence_frame_count_follows_timing() {
        let mut pipeline = RenderPipeline::new(small_config(), quiet()).unwrap();
        let definition = AnimationDefinition::new("Starfield", "starfield", &[51]);
        let render = pipeline.render_sequence(&definition).unwrap();
        assert_eq!(render.frame_hashes.len(), 6);
        assert_eq!(&render.bytes[..6], b"GIF89a");

        let sidecar = pipeline.sidecar(&definition, &render).unwrap();
        assert_eq!(sidecar.frame_count, 6);
        assert_eq!(sidecar.delay_centiseconds, 8);
        assert_eq!(sidecar.slug, "starfield");
    }

    #[test]
    fn still_matches_last_sequence_frame() {
        let definition = AnimationDefinition::new("Ripple", "ripple", &[39]);
        let mut pipeline = RenderPipeline::new(small_config(), quiet()).unwrap();
        let render = pipeline.render_sequence(&definition).unwrap();
        let still = pipeline.render_still_canvas(&definition).unwrap();
        assert_eq!(render.frame_hashes.last(), Some(&still.hash()));
    }

    #[test]
    fn activity_and_theme_reach_the_model() {
        let base = AnimationDefinition::new("Starfield", "starfield", &[51]);
        let mut pipeline = RenderPipeline::new(small_config(), quiet()).unwrap();
        let baseline = pipeline.render_sequence(&base).unwrap().frame_hashes;

        let busy = AnimationDefinition {
            activity: Some(4.0),
            ..base.clone()
        };
        assert_ne!(pipeline.render_sequence(&busy).unwrap().frame_hashes, baseline);

        let themed = AnimationDefinition {
            theme: Some(vec![196]),
            ..base
        };
        assert_ne!(pipeline.render_sequence(&themed).unwrap().frame_hashes, baseline);
    }

    #[test]
    fn failed_gif_write_leaves_no_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the GIF should go makes the rename fail.
        let blocker = dir.path().join("ripple.gif");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let definition = AnimationDefinition::new("Ripple", "ripple", &[39]);
        let mut pipeline = RenderPipeline::new(small_config(), quiet()).unwrap();
        assert!(pipeline
            .render_to(&definition, dir.path(), OutputKind::Sequence, true)
            .is_err());
        assert!(!dir.path().join("ripple.json").exists());

        std::fs::remove_dir_all(&blocker).unwrap();
        let artifact = pipeline
            .render_to(&definition, dir.path(), OutputKind::Sequence, true)
            .unwrap();
        assert!(artifact.path.is_file());
        assert!(artifact.sidecar.is_some_and(|path| path.is_file()));
    }

    #[test]
    fn zero_duration_still_is_refused() {
        let config = RenderConfig {
            duration: 0.0,
            ..small_config()
        };
        let mut pipeline = RenderPipeline::new(config, quiet()).unwrap();
        let definition = AnimationDefinition::new("Ripple", "ripple", &[39]);
        let error = pipeline.render_still_canvas(&definition).unwrap_err();
        assert_eq!(find_coded_error(&error).unwrap().code, EMPTY_FRAME_SEQUENCE);
    }

    #[test]
    fn failing_animation_does_not_stop_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config();
        config.animations = vec![
            AnimationDefinition::new("Aurora", "aurora", &[46]),
            AnimationDefinition::new("Ripple", "ripple", &[39]),
        ];
        let catalog = Catalog::from_config(&config);
        let mut pipeline = RenderPipeline::new(config, quiet()).unwrap();
        let report = pipeline
            .render_catalog(&catalog, dir.path(), OutputKind::Still, false)
            .unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "Aurora");
        assert_eq!(
            find_coded_error(&report.failures[0].1).unwrap().code,
            UNKNOWN_ANIMATION_CLASS
        );
        assert_eq!(report.artifacts.len(), 1);
        assert!(dir.path().join("ripple.png").is_file());
        assert!(!dir.path().join("aurora.png").exists());
    }
}
