// vbtracker_sim/src/simulation/sensors/imu.rs

use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::simulation::config::structs::Noise;
use crate::simulation::core::error::SimError;
use vbtracker_core::messages::ImuReport;

/// An integrated IMU reporting noisy absolute orientation and angular velocity.
#[derive(Debug, Clone)]
pub struct SimulatedImu {
    orientation_noise: Normal<f64>,
    gyro_noise: Normal<f64>,
}

impl SimulatedImu {
    pub fn new(noise: &Noise) -> Result<Self, SimError> {
        let normal = |field: &'static str, stddev: f64| {
            Normal::new(0.0, stddev).map_err(|e| SimError::Invalid {
                field,
                reason: e.to_string(),
            })
        };
        Ok(Self {
            orientation_noise: normal("noise.imu_orientation_stddev", noise.imu_orientation_stddev)?,
            gyro_noise: normal("noise.imu_gyro_stddev", noise.imu_gyro_stddev)?,
        })
    }

    /// Both reports for time `t`, orientation first.
    pub fn sample<R: Rng>(
        &self,
        t: f64,
        orientation: &UnitQuaternion<f64>,
        angular_velocity: &Vector3<f64>,
        rng: &mut R,
    ) -> [ImuReport; 2] {
        let tilt = Vector3::from_fn(|_, _| self.orientation_noise.sample(&mut *rng));
        let gyro = Vector3::from_fn(|_, _| self.gyro_noise.sample(&mut *rng));
        [
            ImuReport::Orientation {
                timestamp: t,
                orientation: UnitQuaternion::from_scaled_axis(tilt) * orientation,
            },
            ImuReport::AngularVelocity {
                timestamp: t,
                angular_velocity: angular_velocity + gyro,
            },
        ]
    }
}
