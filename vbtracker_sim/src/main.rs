// vbtracker_sim/src/main.rs

//! Runs one scenario end to end and prints how well the tracker did.
//!
//! `cargo run -p vbtracker_sim -- --scenario assets/scenarios/default.toml`

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vbtracker_sim::cli::Cli;
use vbtracker_sim::prelude::*;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_filter())),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // --- 1. Load Scenario ---
    let mut config = ScenarioConfig::load(&cli.scenario)
        .with_context(|| format!("loading {}", cli.scenario.display()))?;
    if let Some(frames) = cli.frames {
        config.simulation.frames = frames;
    }
    if cli.seed.is_some() {
        config.simulation.seed = cli.seed;
    }

    // --- 2. Run ---
    let mut simulation = Simulation::new(config).context("setting up simulation")?;
    let summary = simulation.run();

    // --- 3. Report ---
    info!("{summary}");
    println!("{summary}");
    Ok(())
}
