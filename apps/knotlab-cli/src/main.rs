use anyhow::Context;
use clap::{Parser, Subcommand};
use knotlab_common::Viewport;
use knotlab_experiments::ExperimentKind;
use knotlab_render::{Experiment, ExperimentConfig, ExperimentSetup, RecordingBackend, export};
use knotlab_render_wgpu::WgpuBackend;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "knotlab-cli", about = "Inspect and render the knot experiments")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the experiments
    List,
    /// Print the backend calls of the first frames of an experiment
    Plan {
        experiment: ExperimentKind,
        /// Number of frames to trace
        #[arg(short, long, default_value = "1")]
        frames: u32,
    },
    /// Render one frame offscreen and write it as PNG
    Render {
        experiment: ExperimentKind,
        /// Logical width
        #[arg(long, default_value = "800")]
        width: f32,
        /// Logical height
        #[arg(long, default_value = "600")]
        height: f32,
        /// Device pixel ratio, clamped to 2
        #[arg(long, default_value = "1")]
        scale_factor: f32,
        /// Seconds of animation to run before rendering
        #[arg(long, default_value = "0")]
        time: f32,
        /// Render at the export scale instead of the drawing buffer size
        #[arg(long)]
        export: bool,
        /// JSON config applied before rendering
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = "exports")]
        out: PathBuf,
    },
}

fn load_setup(kind: ExperimentKind, config: Option<&Path>) -> anyhow::Result<ExperimentSetup> {
    let mut setup = kind.setup()?;
    if let Some(path) = config {
        ExperimentConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?
            .apply(&mut setup)?;
    }
    Ok(setup)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::List => {
            println!("knotlab-cli v{}", env!("CARGO_PKG_VERSION"));
            for kind in ExperimentKind::ALL {
                println!("{:<12} {}", kind.name(), kind.description());
            }
        }
        Commands::Plan { experiment, frames } => {
            let mut backend = RecordingBackend::new();
            let mut running = Experiment::new(
                load_setup(experiment, None)?,
                Viewport::new(800.0, 600.0, 1.0),
                &mut backend,
            )?;
            for _ in 0..frames {
                running.advance(1.0 / 60.0);
                running.render_frame(&mut backend)?;
            }
            for command in backend.commands() {
                println!("{command}");
            }
        }
        Commands::Render {
            experiment,
            width,
            height,
            scale_factor,
            time,
            export: at_export_scale,
            config,
            out,
        } => {
            tracing::info!("rendering `{experiment}` headless at {width}x{height} @ {scale_factor}");
            let mut backend = WgpuBackend::headless()?;
            let mut running = Experiment::new(
                load_setup(experiment, config.as_deref())?,
                Viewport::new(width, height, scale_factor),
                &mut backend,
            )?;
            running.advance(time);
            let capture = if at_export_scale {
                running.export(&mut backend)?
            } else {
                running.capture_frame(&mut backend)?
            };
            let path = export::save_png(&capture, &out, running.name())?;
            println!("wrote {} ({})", path.display(), capture.extent);
            running.release(&mut backend);
        }
    }

    Ok(())
}
