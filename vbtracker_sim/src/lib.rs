// vbtracker_sim/src/lib.rs

//! Synthetic-data driver for the `vbtracker_core` pose estimator: renders a
//! beacon constellation on a moving body into a simulated camera (and,
//! optionally, an integrated IMU) and scores the tracker against ground truth.

// This prelude is for convenience for other files WITHIN the vbtracker_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;
