// vbtracker_core/src/state/augmented.rs

use nalgebra::{DMatrix, DVector};

use super::layout::{AUGMENTED_BEACON, AUGMENTED_STATE_DIM, BEACON_STATE_DIM, BODY_STATE_DIM};
use super::{BeaconState, BodyState, ErrorState};

/// A body state and one beacon state, borrowed together for the duration of
/// a single correction.
///
/// The joint covariance is block-diagonal: cross-covariance between the body
/// and a beacon is not tracked between corrections, so only the two diagonal
/// blocks are written back.
#[derive(Debug)]
pub struct AugmentedState<'a> {
    body: &'a mut BodyState,
    beacon: &'a mut BeaconState,
}

impl<'a> AugmentedState<'a> {
    pub fn new(body: &'a mut BodyState, beacon: &'a mut BeaconState) -> Self {
        Self { body, beacon }
    }

    pub fn body(&self) -> &BodyState {
        &*self.body
    }

    pub fn beacon(&self) -> &BeaconState {
        &*self.beacon
    }
}

impl ErrorState for AugmentedState<'_> {
    fn error_dim(&self) -> usize {
        AUGMENTED_STATE_DIM
    }

    fn error_covariance(&self) -> DMatrix<f64> {
        let mut p = DMatrix::zeros(AUGMENTED_STATE_DIM, AUGMENTED_STATE_DIM);
        p.view_mut((0, 0), (BODY_STATE_DIM, BODY_STATE_DIM))
            .copy_from(&self.body.error_covariance());
        p.view_mut(
            (AUGMENTED_BEACON, AUGMENTED_BEACON),
            (BEACON_STATE_DIM, BEACON_STATE_DIM),
        )
        .copy_from(&self.beacon.error_covariance());
        p
    }

    fn apply_correction(&mut self, delta: &DVector<f64>, covariance: &DMatrix<f64>) {
        debug_assert_eq!(delta.nrows(), AUGMENTED_STATE_DIM);
        let body_delta = delta.rows(0, BODY_STATE_DIM).into_owned();
        let body_cov = covariance
            .view((0, 0), (BODY_STATE_DIM, BODY_STATE_DIM))
            .into_owned();
        let beacon_delta = delta.rows(AUGMENTED_BEACON, BEACON_STATE_DIM).into_owned();
        let beacon_cov = covariance
            .view(
                (AUGMENTED_BEACON, AUGMENTED_BEACON),
                (BEACON_STATE_DIM, BEACON_STATE_DIM),
            )
            .into_owned();
        self.body.apply_correction(&body_delta, &body_cov);
        self.beacon.apply_correction(&beacon_delta, &beacon_cov);
    }
}
