//! Emberfall arena simulator.
//!
//! Runs one scenario headless and logs the outcome.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use emberfall_sim::{Arena, ScenarioConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Headless arena combat simulator
#[derive(Parser, Debug)]
#[command(name = "emberfall-sim")]
#[command(about = "Headless arena combat simulator")]
#[command(version)]
struct Args {
    /// Scenario file (TOML); defaults are used when it does not exist
    #[arg(value_name = "SCENARIO", default_value = "arena.toml")]
    scenario: PathBuf,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the simulated duration in seconds
    #[arg(long, value_name = "SECONDS")]
    duration: Option<f32>,

    /// Write the JSON run summary here
    #[arg(long, value_name = "OUTPUT_PATH")]
    output: Option<PathBuf>,

    /// Write the effective scenario as TOML and exit
    #[arg(long, value_name = "PATH")]
    dump_scenario: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("emberfall=info".parse()?))
        .init();

    let args = Args::parse();
    info!("Emberfall sim {}", env!("CARGO_PKG_VERSION"));

    let mut config = ScenarioConfig::load_from(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(duration) = args.duration {
        config.duration = duration;
    }
    if args.output.is_some() {
        config.output = args.output;
    }
    config.validate();

    if let Some(path) = &args.dump_scenario {
        config.save_to(path)?;
        return Ok(());
    }

    let mut arena = Arena::from_config(&config)?;
    let summary = arena.run(config.duration);
    if let Some(path) = &config.output {
        summary
            .write_json(path)
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }
    Ok(())
}
