// vbtracker_sim/src/simulation/world/motion.rs

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::simulation::config::structs::Motion;

/// Ground-truth body trajectory: a horizontal orbit in front of the camera
/// combined with a yaw oscillation about the camera's vertical axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    center: Vector3<f64>,
    orbit_radius: f64,
    orbit_rate: f64,
    spin_amplitude: f64,
    spin_rate: f64,
}

impl Trajectory {
    pub fn new(config: &Motion) -> Self {
        Self {
            center: Vector3::from(config.center),
            orbit_radius: config.orbit_radius,
            orbit_rate: config.orbit_rate,
            spin_amplitude: config.spin_amplitude,
            spin_rate: config.spin_rate,
        }
    }

    /// Body-to-camera transform at time `t`.
    pub fn pose_at(&self, t: f64) -> Isometry3<f64> {
        let phase = self.orbit_rate * t;
        let offset = Vector3::new(phase.cos(), phase.sin(), 0.0) * self.orbit_radius;
        let yaw = self.spin_amplitude * (self.spin_rate * t).sin();
        Isometry3::from_parts(
            Translation3::from(self.center + offset),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw),
        )
    }

    /// Angular velocity at time `t`, camera frame.
    pub fn angular_velocity_at(&self, t: f64) -> Vector3<f64> {
        let yaw_rate = self.spin_amplitude * self.spin_rate * (self.spin_rate * t).cos();
        Vector3::y() * yaw_rate
    }
}
