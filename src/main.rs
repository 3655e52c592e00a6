use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use stardust_render::catalog::Catalog;
use stardust_render::compositor::GlowMode;
use stardust_render::config::{load_render_config, RenderConfig, RenderOverrides};
use stardust_render::error_codes::{
    envelope_for, find_coded_error, CodedError, CodedErrorKind, UNKNOWN_ANIMATION_CLASS,
};
use stardust_render::models::MODEL_CLASSES;
use stardust_render::pipeline::{OutputKind, RenderPipeline, Reporter, SweepReport};

#[derive(Debug, Parser)]
#[command(name = "stardust-render")]
#[command(version = env!("STARDUST_VERSION"))]
#[command(about = "Render terminal particle animations into looping GIFs and annotated stills")]
struct Cli {
    /// Suppress progress lines. Errors are always printed.
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Print errors as JSON envelopes on stderr.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// YAML render config; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Only process the animation with this name or slug.
    #[arg(long)]
    only: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    fps: Option<u32>,
    /// Recorded length in seconds.
    #[arg(long)]
    duration: Option<f64>,
    #[arg(long = "max-colors")]
    max_colors: Option<usize>,
    /// none | offset | blur
    #[arg(long)]
    glow: Option<GlowMode>,
    /// TrueType/OpenType font for glyphs and labels.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render every catalog animation to <out>/<slug>.gif.
    Render {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(short = 'o', long = "out", default_value = "assets")]
        out: PathBuf,
        /// Also write <out>/<slug>.json with frame hashes.
        #[arg(long)]
        sidecar: bool,
    },
    /// Render one annotated still per animation to <out>/<slug>.png.
    Still {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(short = 'o', long = "out", default_value = "assets")]
        out: PathBuf,
    },
    /// Print the catalog.
    List {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Validate config and catalog without rendering.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    let reporter = Reporter { quiet: cli.quiet };

    let result = match cli.command {
        Commands::Render {
            config,
            out,
            sidecar,
        } => run_render(&config, out, OutputKind::Sequence, sidecar, reporter, json),
        Commands::Still { config, out } => {
            run_render(&config, out, OutputKind::Still, false, reporter, json)
        }
        Commands::List { config } => run_list(&config, json),
        Commands::Check { config } => run_check(&config),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            report_error(&error, json, reporter);
            exit_code_for(&error)
        }
    }
}

fn report_error(error: &anyhow::Error, json: bool, reporter: Reporter) {
    if json {
        match serde_json::to_string(&envelope_for(error)) {
            Ok(line) => eprintln!("{line}"),
            Err(_) => reporter.error(format!("{error:#}")),
        }
    } else {
        reporter.error(format!("{error:#}"));
    }
}

fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    match find_coded_error(error).map(|coded| coded.kind) {
        Some(CodedErrorKind::Usage) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn load_config(args: &ConfigArgs) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => load_render_config(path)?,
        None => RenderConfig::default(),
    };
    RenderOverrides {
        seed: args.seed,
        fps: args.fps,
        duration: args.duration,
        max_colors: args.max_colors,
        glow: args.glow,
        font: args.font.clone(),
    }
    .apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn load_catalog(args: &ConfigArgs, config: &RenderConfig) -> Result<Catalog> {
    Catalog::from_config(config).select(args.only.as_deref())
}

fn run_render(
    args: &ConfigArgs,
    out: PathBuf,
    kind: OutputKind,
    sidecar: bool,
    reporter: Reporter,
    json: bool,
) -> Result<ExitCode> {
    let config = load_config(args)?;
    let catalog = load_catalog(args, &config)?;
    let mut pipeline = RenderPipeline::new(config, reporter)?;
    let report = pipeline.render_catalog(&catalog, &out, kind, sidecar)?;
    Ok(finish_sweep(&report, json, reporter))
}

fn finish_sweep(report: &SweepReport, json: bool, reporter: Reporter) -> ExitCode {
    if json {
        for (_, error) in &report.failures {
            if let Ok(line) = serde_json::to_string(&envelope_for(error)) {
                eprintln!("{line}");
            }
        }
    }
    if report.succeeded() {
        reporter.progress(format!("All {} artifacts rendered.", report.artifacts.len()));
        ExitCode::SUCCESS
    } else {
        reporter.error(format!(
            "{} of {} animations failed: {}",
            report.failures.len(),
            report.failures.len() + report.artifacts.len(),
            report
                .failures
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        ExitCode::FAILURE
    }
}

fn run_list(args: &ConfigArgs, json: bool) -> Result<ExitCode> {
    let config = load_config(args)?;
    let catalog = load_catalog(args, &config)?;
    if json {
        let entries = catalog
            .animations()
            .iter()
            .map(|animation| {
                json!({
                    "name": animation.name,
                    "slug": animation.slug(),
                    "class": animation.class,
                    "colors": animation.colors(),
                    "activity": animation.activity,
                })
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }
    for animation in catalog.animations() {
        println!(
            "{:<16} {:<10} colors={:?}  ({})",
            animation.slug(),
            animation.class,
            animation.colors(),
            animation.name
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: &ConfigArgs) -> Result<ExitCode> {
    let config = load_config(args)?;
    let catalog = load_catalog(args, &config)?;
    let timing = config.timing();
    let settings = config.compositor_settings();

    let unknown = catalog
        .animations()
        .iter()
        .filter(|animation| !animation.has_known_class())
        .map(|animation| format!("{} ({})", animation.name, animation.class))
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(CodedError::usage(
            UNKNOWN_ANIMATION_CLASS,
            format!(
                "unknown animation class in: {}. Supported: {}",
                unknown.join(", "),
                MODEL_CLASSES.join(", ")
            ),
        )
        .into());
    }
    println!(
        "OK: {} ({}x{} cells, {}x{} px, {} fps, {} frames, glow {}, palette {})",
        args.config
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_owned()),
        config.columns,
        config.rows,
        config.columns as u32 * settings.cell_width,
        (config.rows - config.status_rows) as u32 * settings.cell_height,
        config.fps,
        timing.total_frames(),
        config.glow.label(),
        config.palette.label()
    );
    println!("Animations: {}", catalog.len());

    Ok(ExitCode::SUCCESS)
}
