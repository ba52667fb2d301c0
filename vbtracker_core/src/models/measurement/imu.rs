// vbtracker_core/src/models/measurement/imu.rs

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};

use super::Measurement;
use crate::state::layout::{ANGULAR_VELOCITY, BODY_STATE_DIM, INCREMENTAL_ROTATION};
use crate::state::BodyState;

/// An absolute orientation report from an integrated IMU.
///
/// The residual is the rotation vector taking the current orientation estimate
/// onto the reported one, expressed on the same (left) side as the body's
/// incremental rotation.
#[derive(Debug, Clone)]
pub struct OrientationMeasurement {
    pub orientation: UnitQuaternion<f64>,
    pub variance: f64,
}

impl Measurement<BodyState> for OrientationMeasurement {
    fn dimension(&self) -> usize {
        3
    }

    fn residual(&self, state: &BodyState) -> Option<DVector<f64>> {
        let error = self.orientation * state.combined_orientation().inverse();
        let r = error.scaled_axis();
        Some(DVector::from_column_slice(r.as_slice()))
    }

    fn jacobian(&self, _state: &BodyState) -> Option<DMatrix<f64>> {
        let mut h = DMatrix::zeros(3, BODY_STATE_DIM);
        h.fixed_view_mut::<3, 3>(0, INCREMENTAL_ROTATION)
            .fill_with_identity();
        Some(h)
    }

    fn covariance(&self, _state: &BodyState) -> DMatrix<f64> {
        DMatrix::identity(3, 3) * self.variance
    }
}

/// An angular-velocity report from a gyroscope, in the tracking frame.
#[derive(Debug, Clone)]
pub struct AngularVelocityMeasurement {
    pub angular_velocity: Vector3<f64>,
    pub variance: f64,
}

impl Measurement<BodyState> for AngularVelocityMeasurement {
    fn dimension(&self) -> usize {
        3
    }

    fn residual(&self, state: &BodyState) -> Option<DVector<f64>> {
        let r = self.angular_velocity - state.angular_velocity();
        Some(DVector::from_column_slice(r.as_slice()))
    }

    fn jacobian(&self, _state: &BodyState) -> Option<DMatrix<f64>> {
        let mut h = DMatrix::zeros(3, BODY_STATE_DIM);
        h.fixed_view_mut::<3, 3>(0, ANGULAR_VELOCITY)
            .fill_with_identity();
        Some(h)
    }

    fn covariance(&self, _state: &BodyState) -> DMatrix<f64> {
        DMatrix::identity(3, 3) * self.variance
    }
}
