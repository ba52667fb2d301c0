// vbtracker_sim/src/prelude.rs

// Re-export the entire vbtracker_core prelude so binaries and tests can reach
// the tracker types alongside the simulation ones.
pub use vbtracker_core::prelude::*;

pub use crate::simulation::config::{ConstellationKind, ScenarioConfig};
pub use crate::simulation::core::{FrameOutcome, RunSummary, SimError, Simulation, SimulationRng};
pub use crate::simulation::sensors::{SimulatedCamera, SimulatedImu};
pub use crate::simulation::world::{Constellation, Trajectory};
