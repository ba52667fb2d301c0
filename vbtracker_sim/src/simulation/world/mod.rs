// vbtracker_sim/src/simulation/world/mod.rs

//! Ground truth: where the beacons really are and how the body really moves.

pub mod constellation;
pub mod motion;

pub use constellation::Constellation;
pub use motion::Trajectory;
