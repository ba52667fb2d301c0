// vbtracker_sim/src/cli.rs

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// vbtracker: runs the video-based SCAAT tracker against a simulated target.
///
/// This struct defines the command-line arguments accepted by the
/// `vbtracker_sim` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/default.toml")]
    pub scenario: PathBuf,

    /// Overrides `simulation.frames` from the scenario.
    #[arg(short, long)]
    pub frames: Option<usize>,

    /// Overrides `simulation.seed` from the scenario.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Raises the log level (-v debug, -vv trace). `RUST_LOG` wins if set.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The log filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "info,vbtracker_sim=debug,vbtracker_core=debug",
            _ => "trace",
        }
    }
}
