// vbtracker_core/src/estimation/kalman.rs

use nalgebra::{DMatrix, DVector};

use crate::models::measurement::Measurement;
use crate::models::process::ProcessModel;
use crate::state::{symmetrize, ErrorState};

/// Performs one prediction step in place. Non-positive `dt` leaves the state
/// untouched.
pub fn predict<S, P>(state: &mut S, process: &P, dt: f64)
where
    P: ProcessModel<S> + ?Sized,
{
    if dt <= 0.0 {
        return;
    }
    process.predict(state, dt);
}

/// The pieces of one linearized measurement update.
#[derive(Debug, Clone)]
pub struct Innovation {
    /// `y = z - h(x)`
    pub residual: DVector<f64>,
    /// `H = ∂h/∂x`
    pub jacobian: DMatrix<f64>,
    /// `R`
    pub noise: DMatrix<f64>,
}

impl Innovation {
    /// Linearizes `measurement` about `state`. `None` if the measurement is
    /// undefined at this state.
    pub fn compute<S, M>(state: &S, measurement: &M) -> Option<Self>
    where
        S: ErrorState + ?Sized,
        M: Measurement<S> + ?Sized,
    {
        Some(Self {
            residual: measurement.residual(state)?,
            jacobian: measurement.jacobian(state)?,
            noise: measurement.covariance(state),
        })
    }
}

/// Fuses one linearized measurement into `state`.
///
/// Returns `false`, leaving the state unchanged, if the innovation covariance
/// cannot be inverted or the update produced non-finite values.
pub fn apply_innovation<S>(state: &mut S, innovation: &Innovation) -> bool
where
    S: ErrorState + ?Sized,
{
    let h = &innovation.jacobian;
    let p = state.error_covariance();
    debug_assert_eq!(h.ncols(), state.error_dim());

    // Standard EKF update equations
    let p_ht = &p * h.transpose();
    let s = h * &p_ht + &innovation.noise;
    let s_inv = match s.try_inverse() {
        Some(inv) => inv,
        None => return false,
    };
    let k_gain = p_ht * s_inv;
    let delta = &k_gain * &innovation.residual;
    let i_kh = DMatrix::<f64>::identity(p.nrows(), p.ncols()) - &k_gain * h;
    let new_p = symmetrize(&(i_kh * p));

    if delta.iter().chain(new_p.iter()).any(|v| !v.is_finite()) {
        return false;
    }
    state.apply_correction(&delta, &new_p);
    true
}

/// Linearizes and fuses `measurement` in one go.
pub fn correct<S, M>(state: &mut S, measurement: &M) -> bool
where
    S: ErrorState + ?Sized,
    M: Measurement<S> + ?Sized,
{
    match Innovation::compute(state, measurement) {
        Some(innovation) => apply_innovation(state, &innovation),
        None => false,
    }
}
