// vbtracker_sim/src/simulation/sensors/mod.rs

pub mod camera;
pub mod imu;

pub use camera::SimulatedCamera;
pub use imu::SimulatedImu;
