//! Compositing benchmarks: one full-size frame per glow mode.
//! Run: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stardust_render::catalog::Catalog;
use stardust_render::compositor::{Compositor, GlowMode};
use stardust_render::config::RenderConfig;
use stardust_render::model::ModelSpawn;
use stardust_render::models::spawn_model;
use stardust_render::painter::GlyphPainter;
use stardust_render::palette::PaletteTable;
use stardust_render::quantize::quantize;
use stardust_render::simulation::capture_grids;

fn bench_composite(c: &mut Criterion) {
    let config = RenderConfig {
        duration: 0.25,
        ..RenderConfig::default()
    };
    let catalog = Catalog::builtin();
    let definition = &catalog.animations()[0];
    let spawn = ModelSpawn::new(
        definition.name.clone(),
        definition.colors.clone(),
        config.seed,
    );
    let mut model = spawn_model(&definition.class, spawn).expect("builtin class");
    let grids = capture_grids(model.as_mut(), config.timing(), config.viewport())
        .expect("capture");
    let grid = grids.last().expect("at least one frame").clone();
    let palette = Arc::new(PaletteTable::build(config.palette));

    let mut group = c.benchmark_group("composite");
    group.sample_size(20);

    for glow in [GlowMode::None, GlowMode::Offset, GlowMode::Blur] {
        let mut settings = config.compositor_settings();
        settings.glow = glow;
        let mut compositor = Compositor::new(
            palette.clone(),
            settings,
            GlyphPainter::builtin(config.font_size),
            GlyphPainter::builtin(config.label_font_size),
        );
        group.bench_function(format!("100x32_{}", glow.label()), |b| {
            b.iter(|| black_box(compositor.composite(&grid, definition, config.viewport())));
        });
    }
    group.finish();

    let mut compositor = Compositor::new(
        palette,
        config.compositor_settings(),
        GlyphPainter::builtin(config.font_size),
        GlyphPainter::builtin(config.label_font_size),
    );
    let canvas = compositor.composite(&grid, definition, config.viewport());
    c.bench_function("quantize_64", |b| {
        b.iter(|| black_box(quantize(&canvas, 64).expect("quantize")));
    });
}

criterion_group!(benches, bench_composite);
criterion_main!(benches);
