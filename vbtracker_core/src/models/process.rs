// vbtracker_core/src/models/process.rs

use std::fmt::Debug;

use nalgebra::Matrix3;

use crate::config::ConfigParams;
use crate::state::body::BodyCovariance;
use crate::state::layout::{ANGULAR_VELOCITY, INCREMENTAL_ROTATION, LINEAR_VELOCITY, POSITION};
use crate::state::{BeaconState, BodyState};

/// A process model describes how a state and its uncertainty evolve over time
/// when no measurement is applied.
pub trait ProcessModel<S>: Debug + Send + Sync {
    /// Advances `state` by `dt` seconds. Callers guarantee `dt > 0`.
    fn predict(&self, state: &mut S, dt: f64);
}

// --- Damped Constant Velocity Model ---
// The body keeps moving with its current linear and angular velocity, which
// decay exponentially towards zero. Acceleration is white noise (modeled by Q).
#[derive(Debug, Clone, PartialEq)]
pub struct DampedConstantVelocityProcess {
    /// Fraction of linear velocity retained after one second.
    pub linear_decay: f64,
    /// Fraction of angular velocity retained after one second.
    pub angular_decay: f64,
    /// Acceleration noise autocorrelation: x, y, z then roll, pitch, yaw.
    pub noise_autocorrelation: [f64; 6],
}

impl DampedConstantVelocityProcess {
    pub fn from_params(params: &ConfigParams) -> Self {
        Self {
            linear_decay: params.linear_velocity_decay_coefficient,
            angular_decay: params.angular_velocity_decay_coefficient,
            noise_autocorrelation: params.process_noise_autocorrelation,
        }
    }

    /// The state transition matrix `A(dt)` of the error state.
    pub fn state_transition(&self, dt: f64) -> BodyCovariance {
        let mut a = BodyCovariance::identity();
        let linear = self.linear_decay.powf(dt);
        let angular = self.angular_decay.powf(dt);
        for i in 0..3 {
            a[(POSITION + i, LINEAR_VELOCITY + i)] = dt;
            a[(INCREMENTAL_ROTATION + i, ANGULAR_VELOCITY + i)] = dt;
            a[(LINEAR_VELOCITY + i, LINEAR_VELOCITY + i)] = linear;
            a[(ANGULAR_VELOCITY + i, ANGULAR_VELOCITY + i)] = angular;
        }
        a
    }

    /// Discretized white-noise-acceleration covariance `Q(dt)`.
    pub fn sampled_noise(&self, dt: f64) -> BodyCovariance {
        let mut q = BodyCovariance::zeros();
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let pairs = [(POSITION, LINEAR_VELOCITY), (INCREMENTAL_ROTATION, ANGULAR_VELOCITY)];
        for (block, (value, rate)) in pairs.into_iter().enumerate() {
            for i in 0..3 {
                let qi = self.noise_autocorrelation[block * 3 + i];
                q[(value + i, value + i)] = qi * dt3 / 3.0;
                q[(value + i, rate + i)] = qi * dt2 / 2.0;
                q[(rate + i, value + i)] = qi * dt2 / 2.0;
                q[(rate + i, rate + i)] = qi * dt;
            }
        }
        q
    }
}

impl ProcessModel<BodyState> for DampedConstantVelocityProcess {
    fn predict(&self, state: &mut BodyState, dt: f64) {
        let a = self.state_transition(dt);
        let x = a * state.state();
        *state.state_mut() = x;
        let p = a * state.covariance() * a.transpose() + self.sampled_noise(dt);
        state.set_covariance((p + p.transpose()) * 0.5);
        state.externalize_rotation();
    }
}

// --- Constant Beacon Process ---
// Beacons do not move on their own; a calibratable beacon random-walks by
// `noise_autocorrelation * dt` per axis so that autocalibration never freezes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBeaconProcess {
    pub noise_autocorrelation: f64,
}

impl ProcessModel<BeaconState> for ConstantBeaconProcess {
    fn predict(&self, state: &mut BeaconState, dt: f64) {
        *state.covariance_mut() += Matrix3::identity() * (self.noise_autocorrelation * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Isometry3, Point3, Vector3};

    fn process() -> DampedConstantVelocityProcess {
        DampedConstantVelocityProcess {
            linear_decay: 0.5,
            angular_decay: 1.0,
            noise_autocorrelation: [1.0; 6],
        }
    }

    #[test]
    fn predicts_position_and_decays_velocity() {
        let mut body = BodyState::new(&Isometry3::identity(), 0.0);
        body.set_linear_velocity(&Vector3::new(1.0, 0.0, 0.0));
        process().predict(&mut body, 1.0);
        assert_abs_diff_eq!(body.position().x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(body.linear_velocity().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn angular_velocity_rotates_and_is_externalized() {
        let mut body = BodyState::new(&Isometry3::identity(), 0.0);
        body.set_angular_velocity(&Vector3::new(0.0, 0.0, 0.2));
        process().predict(&mut body, 0.5);
        assert_abs_diff_eq!(body.orientation().angle(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(body.incremental_rotation(), Vector3::zeros());
    }

    #[test]
    fn prediction_grows_uncertainty() {
        let mut body = BodyState::new(&Isometry3::identity(), 1e-3);
        let before = body.covariance().trace();
        process().predict(&mut body, 0.1);
        assert!(body.covariance().trace() > before);
        let p = body.covariance();
        assert_abs_diff_eq!(*p, p.transpose(), epsilon = 1e-15);
    }

    #[test]
    fn beacon_process_adds_isotropic_noise() {
        let mut beacon = BeaconState::new(&Point3::origin(), 1e-4);
        ConstantBeaconProcess {
            noise_autocorrelation: 2e-4,
        }
        .predict(&mut beacon, 0.5);
        assert_abs_diff_eq!(beacon.variance(), Vector3::repeat(2e-4), epsilon = 1e-15);
    }
}
