// vbtracker_sim/src/simulation/core/mod.rs

pub mod error;
pub mod prng;
pub mod runner;

pub use error::SimError;
pub use prng::SimulationRng;
pub use runner::{FrameOutcome, RunSummary, Simulation};
