// vbtracker_core/src/estimation/mod.rs

use dyn_clone::DynClone;
use nalgebra::{Isometry3, Vector3};
use std::fmt::Debug;

use crate::camera::CameraParameters;
use crate::messages::{BeaconDebugData, LedMeasurement};
use crate::state::{BeaconState, BodyState};

pub mod bounding_box;
pub mod health;
pub mod kalman;
pub mod scaat;

pub use health::{HealthMonitor, TrackingHealth};
pub use scaat::ScaatKalmanPoseEstimator;

/// The beacon-side view of a target handed to an estimator for one frame.
///
/// All slices are parallel and indexed by zero-based beacon id.
#[derive(Debug)]
pub struct TargetBeacons<'a> {
    pub states: &'a mut [BeaconState],
    /// Per-beacon base measurement variance.
    pub measurement_variance: &'a [f64],
    /// Fixed beacons are never predicted and never autocalibrated.
    pub fixed: &'a [bool],
    /// Unit emission direction of each beacon, target frame.
    pub emission_direction: &'a [Vector3<f64>],
    pub target_to_body: &'a Isometry3<f64>,
}

impl TargetBeacons<'_> {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Everything an estimator needs to process one video frame for one target.
#[derive(Debug)]
pub struct EstimatorInput<'a> {
    /// The camera the measurements were taken with. Estimators use its
    /// undistorted variant; the blob locations are already undistorted.
    pub camera: &'a CameraParameters,
    pub leds: &'a mut [LedMeasurement],
    pub beacons: TargetBeacons<'a>,
    /// Body state, already predicted to the frame time.
    pub body: &'a mut BodyState,
    /// Seconds since the previous video frame for this target.
    pub video_dt: f64,
    /// Per-beacon debug slots, parallel to `beacons`.
    pub debug: Option<&'a mut [BeaconDebugData]>,
}

/// The contract for any algorithm that refines a body pose from the beacons
/// of one target seen in a single frame.
pub trait PoseEstimator: DynClone + Debug + Send + Sync {
    /// Applies the frame's measurements. Returns `true` if at least one
    /// correction was applied to the body state.
    fn estimate(&mut self, input: EstimatorInput<'_>) -> bool;

    /// Health verdict after the most recent frame.
    fn health(&self) -> TrackingHealth;

    /// Clears all per-estimator history (counters, probation).
    fn reset(&mut self);
}

dyn_clone::clone_trait_object!(PoseEstimator);
