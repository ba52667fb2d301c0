// vbtracker_core/src/lib.rs

//! Pose estimation for video/inertial body tracking: a SCAAT Kalman filter
//! that refines rigid-body poses one beacon observation at a time, with online
//! beacon autocalibration and a tracking-health state machine.

pub mod camera;
pub mod config;
pub mod error;
pub mod estimation;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod state;
pub mod tracking;
pub mod types;
