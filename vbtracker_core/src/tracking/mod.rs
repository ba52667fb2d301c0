// vbtracker_core/src/tracking/mod.rs

//! The ownership tree of the tracker: a system owns bodies, a body owns its
//! optional target and IMU, and a target owns its beacon tables.

pub mod body;
pub mod imu;
pub mod system;
pub mod target;

pub use body::TrackedBody;
pub use imu::TrackedBodyImu;
pub use system::TrackingSystem;
pub use target::{TargetSetup, TrackedBodyTarget};
