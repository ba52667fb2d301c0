// vbtracker_core/src/models/mod.rs

//! Process models (how states evolve between measurements) and measurement
//! models (how a state maps onto what a sensor reports).

pub mod measurement;
pub mod process;
