// vbtracker_core/src/state/beacon.rs

use nalgebra::{DMatrix, DVector, Matrix3, Point3, Vector3};

use super::layout::BEACON_STATE_DIM;
use super::ErrorState;

/// Position of one beacon in its target's frame, with uncertainty.
///
/// A fixed beacon carries zero covariance and is never predicted, so no
/// correction can move it. A calibratable beacon random-walks slowly and is
/// refined by every correction it takes part in.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconState {
    position: Vector3<f64>,
    covariance: Matrix3<f64>,
}

impl BeaconState {
    pub fn new(position: &Point3<f64>, variance: f64) -> Self {
        Self {
            position: position.coords,
            covariance: Matrix3::identity() * variance,
        }
    }

    pub fn position(&self) -> Point3<f64> {
        Point3::from(self.position)
    }

    pub fn set_position(&mut self, position: &Point3<f64>) {
        self.position = position.coords;
    }

    pub fn covariance(&self) -> &Matrix3<f64> {
        &self.covariance
    }

    pub fn covariance_mut(&mut self) -> &mut Matrix3<f64> {
        &mut self.covariance
    }

    /// Per-axis variance of the position estimate.
    pub fn variance(&self) -> Vector3<f64> {
        self.covariance.diagonal()
    }
}

impl ErrorState for BeaconState {
    fn error_dim(&self) -> usize {
        BEACON_STATE_DIM
    }

    fn error_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(BEACON_STATE_DIM, BEACON_STATE_DIM, self.covariance.as_slice())
    }

    fn apply_correction(&mut self, delta: &DVector<f64>, covariance: &DMatrix<f64>) {
        debug_assert_eq!(delta.nrows(), BEACON_STATE_DIM);
        self.position += Vector3::from_column_slice(delta.as_slice());
        self.covariance = Matrix3::from_column_slice(covariance.as_slice());
    }
}
