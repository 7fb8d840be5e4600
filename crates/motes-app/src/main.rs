use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use motes_app::{Point, RunOptions, run_headless};
use motes_core::{MotesConfig, Preset};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "motes",
    version,
    about = "Run the motes particle simulation headlessly"
)]
struct Cli {
    /// Baseline preset (default, snow, bubbles, constellation).
    #[arg(long, env = "MOTES_PRESET", default_value_t = Preset::Default)]
    preset: Preset,

    /// JSON file whose object is merged onto the preset.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Frame callbacks to deliver, including the baseline frame.
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Simulated frame rate used for timestamps.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Override the RNG seed.
    #[arg(long, env = "MOTES_SEED")]
    seed: Option<u64>,

    /// Click at `x,y`; repeat to click several times across the run.
    #[arg(long = "click", value_name = "X,Y")]
    clicks: Vec<Point>,

    /// Keep the pointer over the surface at `x,y`.
    #[arg(long, value_name = "X,Y")]
    pointer: Option<Point>,

    /// Log progress every N ticks (0 disables).
    #[arg(long, default_value_t = 60)]
    report_every: u64,

    /// Print the merged configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli)?;
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }

    if cli.print_config {
        let json = serde_json::to_string_pretty(&config).context("failed to serialise config")?;
        println!("{json}");
        return Ok(());
    }

    let options = RunOptions {
        width: cli.width,
        height: cli.height,
        frames: cli.frames,
        fps: cli.fps,
        clicks: cli.clicks,
        pointer: cli.pointer,
        report_every: cli.report_every,
    };
    let summary = run_headless(config, &options)?;
    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        particles = summary.particles,
        "headless run finished"
    );
    println!(
        "{}",
        serde_json::to_string(&summary).context("failed to serialise summary")?
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<MotesConfig> {
    let Some(path) = cli.config.as_ref() else {
        return Ok(cli.preset.config());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    MotesConfig::from_json_str(cli.preset, &text)
        .with_context(|| format!("invalid config file {}", path.display()))
}
