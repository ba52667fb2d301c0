// vbtracker_core/src/models/measurement/mod.rs

use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

use crate::state::ErrorState;

// --- MEASUREMENT MODEL TRAIT ---
// Represents the mathematical model of a sensor. `z = h(x) + v`
pub trait Measurement<S: ErrorState + ?Sized>: Debug {
    /// Number of rows of the measurement vector `z`.
    fn dimension(&self) -> usize;

    /// The innovation `z - h(x)`.
    ///
    /// Returns `None` when `h(x)` is undefined for this state (e.g. the
    /// predicted point lies behind the camera); no correction is possible then.
    fn residual(&self, state: &S) -> Option<DVector<f64>>;

    /// Calculates the measurement Jacobian `H = ∂h/∂x` w.r.t. the error state.
    fn jacobian(&self, state: &S) -> Option<DMatrix<f64>>;

    /// Returns the measurement noise covariance matrix `R`.
    fn covariance(&self, state: &S) -> DMatrix<f64>;
}

pub mod image_point;
pub mod imu;

pub use image_point::ImagePointMeasurement;
pub use imu::{AngularVelocityMeasurement, OrientationMeasurement};
