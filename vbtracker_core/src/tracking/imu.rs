// vbtracker_core/src/tracking/imu.rs

use crate::config::ConfigParams;
use crate::estimation::kalman;
use crate::messages::ImuReport;
use crate::models::measurement::{AngularVelocityMeasurement, OrientationMeasurement};
use crate::state::BodyState;

/// A fully-integrated IMU rigidly attached to a body.
///
/// Reports are applied as direct corrections of the body state; the body is
/// predicted to the report time by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedBodyImu {
    orientation_variance: f64,
    angular_velocity_variance: f64,
    has_pose_estimate: bool,
}

impl TrackedBodyImu {
    pub fn new(params: &ConfigParams) -> Self {
        Self {
            orientation_variance: params.imu_orientation_variance,
            angular_velocity_variance: params.imu_angular_velocity_variance,
            has_pose_estimate: false,
        }
    }

    /// Applies one report. Returns whether the correction succeeded.
    pub fn update(&mut self, report: &ImuReport, state: &mut BodyState) -> bool {
        let applied = match report {
            ImuReport::Orientation { orientation, .. } => {
                let meas = OrientationMeasurement {
                    orientation: *orientation,
                    variance: self.orientation_variance,
                };
                kalman::correct(state, &meas)
            }
            ImuReport::AngularVelocity {
                angular_velocity, ..
            } => {
                let meas = AngularVelocityMeasurement {
                    angular_velocity: *angular_velocity,
                    variance: self.angular_velocity_variance,
                };
                kalman::correct(state, &meas)
            }
        };
        // Only an absolute orientation gives us something worth calling a pose.
        if applied && matches!(report, ImuReport::Orientation { .. }) {
            self.has_pose_estimate = true;
        }
        applied
    }

    pub fn has_pose_estimate(&self) -> bool {
        self.has_pose_estimate
    }
}
