// vbtracker_core/src/state/body.rs

use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix3, Matrix6, SMatrix, SVector, Translation3,
    UnitQuaternion, Vector3,
};

use super::layout::{
    ANGULAR_VELOCITY, BODY_STATE_DIM, INCREMENTAL_ROTATION, LINEAR_VELOCITY, POSITION,
};
use super::ErrorState;

pub type BodyVector = SVector<f64, BODY_STATE_DIM>;
pub type BodyCovariance = SMatrix<f64, BODY_STATE_DIM, BODY_STATE_DIM>;

/// The Kalman state of a rigid body: an error-state vector (see
/// `state::layout`) with its covariance, plus the externalized orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    state: BodyVector,
    covariance: BodyCovariance,
    orientation: UnitQuaternion<f64>,
}

impl Default for BodyState {
    fn default() -> Self {
        Self::new(&Isometry3::identity(), 1.0)
    }
}

impl BodyState {
    /// A body resting at `pose` with `initial_variance` on every error component.
    pub fn new(pose: &Isometry3<f64>, initial_variance: f64) -> Self {
        let mut state = BodyVector::zeros();
        state
            .fixed_rows_mut::<3>(POSITION)
            .copy_from(&pose.translation.vector);
        Self {
            state,
            covariance: BodyCovariance::identity() * initial_variance,
            orientation: pose.rotation,
        }
    }

    pub fn state(&self) -> &BodyVector {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BodyVector {
        &mut self.state
    }

    pub fn covariance(&self) -> &BodyCovariance {
        &self.covariance
    }

    pub fn set_covariance(&mut self, covariance: BodyCovariance) {
        self.covariance = covariance;
    }

    pub fn position(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(POSITION).into_owned()
    }

    pub fn incremental_rotation(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(INCREMENTAL_ROTATION).into_owned()
    }

    pub fn linear_velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(LINEAR_VELOCITY).into_owned()
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(ANGULAR_VELOCITY).into_owned()
    }

    pub fn set_linear_velocity(&mut self, v: &Vector3<f64>) {
        self.state.fixed_rows_mut::<3>(LINEAR_VELOCITY).copy_from(v);
    }

    pub fn set_angular_velocity(&mut self, w: &Vector3<f64>) {
        self.state.fixed_rows_mut::<3>(ANGULAR_VELOCITY).copy_from(w);
    }

    /// The externalized orientation, without the pending incremental rotation.
    pub fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.orientation
    }

    /// Body-to-camera rotation including the pending incremental rotation.
    pub fn combined_orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_scaled_axis(self.incremental_rotation()) * self.orientation
    }

    /// Body-to-camera transform.
    pub fn pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.position()),
            self.combined_orientation(),
        )
    }

    /// Folds the incremental rotation into the quaternion and zeroes it.
    pub fn externalize_rotation(&mut self) {
        self.orientation = self.combined_orientation();
        self.state
            .fixed_rows_mut::<3>(INCREMENTAL_ROTATION)
            .fill(0.0);
    }

    /// Covariance of position and incremental rotation.
    pub fn pose_covariance(&self) -> Matrix6<f64> {
        self.covariance.fixed_view::<6, 6>(0, 0).into_owned()
    }

    /// Covariance of the position block alone.
    pub fn position_covariance(&self) -> Matrix3<f64> {
        self.covariance
            .fixed_view::<3, 3>(POSITION, POSITION)
            .into_owned()
    }
}

impl ErrorState for BodyState {
    fn error_dim(&self) -> usize {
        BODY_STATE_DIM
    }

    fn error_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(BODY_STATE_DIM, BODY_STATE_DIM, self.covariance.as_slice())
    }

    fn apply_correction(&mut self, delta: &DVector<f64>, covariance: &DMatrix<f64>) {
        debug_assert_eq!(delta.nrows(), BODY_STATE_DIM);
        self.state += BodyVector::from_column_slice(delta.as_slice());
        self.covariance = BodyCovariance::from_column_slice(covariance.as_slice());
        self.externalize_rotation();
    }
}
