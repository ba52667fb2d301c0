// vbtracker_core/src/state/mod.rs

//! Kalman states: the rigid-body pose state, the per-beacon position states,
//! and the augmented view that joins the two for a single correction.

use nalgebra::{DMatrix, DVector};

pub mod augmented;
pub mod beacon;
pub mod body;
pub mod layout;

pub use augmented::AugmentedState;
pub use beacon::BeaconState;
pub use body::BodyState;

/// The contract every state must satisfy to be corrected by the generic
/// Kalman update in `estimation::kalman`.
///
/// States expose their error covariance in dynamic form so that states of
/// different sizes (and compositions of states) share one update routine.
pub trait ErrorState {
    /// Number of rows of the error-state vector.
    fn error_dim(&self) -> usize;

    /// The error covariance `P`, `error_dim x error_dim`.
    fn error_covariance(&self) -> DMatrix<f64>;

    /// Adds the correction `delta` to the state and replaces `P`.
    fn apply_correction(&mut self, delta: &DVector<f64>, covariance: &DMatrix<f64>);
}

/// Averages `P` with its transpose to remove round-off asymmetry.
pub(crate) fn symmetrize(p: &DMatrix<f64>) -> DMatrix<f64> {
    (p + p.transpose()) * 0.5
}
