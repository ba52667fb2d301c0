// vbtracker_core/src/tracking/target.rs

use nalgebra::{Isometry3, Matrix3, Point3, Vector3};

use crate::camera::CameraParameters;
use crate::config::ConfigParams;
use crate::error::TargetError;
use crate::estimation::{
    EstimatorInput, PoseEstimator, ScaatKalmanPoseEstimator, TargetBeacons, TrackingHealth,
};
use crate::messages::{BeaconDebugData, LedMeasurement};
use crate::state::{BeaconState, BodyState};
use crate::types::{OneBasedBeaconId, ToOneBased, ZeroBasedBeaconId};

/// The known layout of a target's beacons, as loaded from a device
/// description. All tables are indexed by zero-based beacon id.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSetup {
    pub positions: Vec<Point3<f64>>,
    /// Direction each beacon emits along, target frame. The camera looks
    /// down +Z, so a beacon facing the camera at identity orientation emits
    /// along `(0, 0, -1)`; a rotated direction with positive z faces away.
    pub emission_directions: Vec<Vector3<f64>>,
    pub measurement_variances: Vec<f64>,
    pub fixed: Vec<bool>,
    /// Per-beacon autocalibration standard deviation. Falls back to
    /// `ConfigParams::initial_beacon_error` when absent.
    pub initial_errors: Option<Vec<f64>>,
}

impl TargetSetup {
    /// A setup where every beacon shares `measurement_variance` and none is
    /// fixed.
    pub fn new(
        positions: Vec<Point3<f64>>,
        emission_directions: Vec<Vector3<f64>>,
        measurement_variance: f64,
    ) -> Self {
        let n = positions.len();
        Self {
            positions,
            emission_directions,
            measurement_variances: vec![measurement_variance; n],
            fixed: vec![false; n],
            initial_errors: None,
        }
    }

    pub fn with_fixed(mut self, fixed: Vec<bool>) -> Self {
        self.fixed = fixed;
        self
    }

    /// Marks every beacon whose one-based id satisfies `predicate` as fixed.
    pub fn mark_fixed_by<F>(mut self, predicate: F) -> Self
    where
        F: Fn(OneBasedBeaconId) -> bool,
    {
        for (index, fixed) in self.fixed.iter_mut().enumerate() {
            if predicate(ZeroBasedBeaconId::from_index(index).to_one_based()) {
                *fixed = true;
            }
        }
        self
    }

    pub fn with_measurement_variances(mut self, variances: Vec<f64>) -> Self {
        self.measurement_variances = variances;
        self
    }

    pub fn with_initial_errors(mut self, errors: Vec<f64>) -> Self {
        self.initial_errors = Some(errors);
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Checks that every table matches the position table and holds usable
    /// values.
    pub fn validate(&self) -> Result<(), TargetError> {
        let expected = self.len();
        if expected == 0 {
            return Err(TargetError::NoBeacons);
        }
        let mut lengths = vec![
            ("emission_directions", self.emission_directions.len()),
            ("measurement_variances", self.measurement_variances.len()),
            ("fixed", self.fixed.len()),
        ];
        if let Some(errors) = &self.initial_errors {
            lengths.push(("initial_errors", errors.len()));
        }
        for (table, found) in lengths {
            if found != expected {
                return Err(TargetError::LengthMismatch {
                    table,
                    expected,
                    found,
                });
            }
        }
        for (index, &variance) in self.measurement_variances.iter().enumerate() {
            if !variance.is_finite() || variance <= 0.0 {
                return Err(TargetError::InvalidVariance { index, variance });
            }
        }
        for (index, direction) in self.emission_directions.iter().enumerate() {
            if !(direction.norm() > f64::EPSILON) {
                return Err(TargetError::DegenerateEmissionDirection { index });
            }
        }
        if let Some(errors) = &self.initial_errors {
            for (index, &error) in errors.iter().enumerate() {
                if !error.is_finite() || error < 0.0 {
                    return Err(TargetError::InvalidVariance {
                        index,
                        variance: error,
                    });
                }
            }
        }
        Ok(())
    }
}

/// # Tracked Body Target
/// A rigid constellation of beacons attached to a body, together with the
/// estimator that turns observations of it into pose corrections.
///
/// The per-beacon tables (state, measurement variance, fixed flag, emission
/// direction, debug data) always have the same length, fixed at construction.
#[derive(Debug, Clone)]
pub struct TrackedBodyTarget {
    setup: TargetSetup,
    target_to_body: Isometry3<f64>,
    beacons: Vec<BeaconState>,
    measurement_variance: Vec<f64>,
    fixed: Vec<bool>,
    emission_direction: Vec<Vector3<f64>>,
    initial_errors: Vec<f64>,
    debug_data: Vec<BeaconDebugData>,
    estimator: Box<dyn PoseEstimator>,
    has_pose_estimate: bool,
}

impl TrackedBodyTarget {
    /// Builds a target running the SCAAT estimator.
    pub fn new(
        setup: TargetSetup,
        target_to_body: Isometry3<f64>,
        params: &ConfigParams,
    ) -> Result<Self, TargetError> {
        let estimator = Box::new(ScaatKalmanPoseEstimator::new(params));
        Self::with_estimator(setup, target_to_body, params, estimator)
    }

    /// Builds a target running a caller-supplied estimator.
    pub fn with_estimator(
        setup: TargetSetup,
        target_to_body: Isometry3<f64>,
        params: &ConfigParams,
        estimator: Box<dyn PoseEstimator>,
    ) -> Result<Self, TargetError> {
        setup.validate()?;
        let n = setup.len();
        let initial_errors = setup
            .initial_errors
            .clone()
            .unwrap_or_else(|| vec![params.initial_beacon_error; n]);
        let mut target = Self {
            beacons: Vec::with_capacity(n),
            measurement_variance: setup.measurement_variances.clone(),
            fixed: setup.fixed.clone(),
            emission_direction: setup
                .emission_directions
                .iter()
                .map(|d| d.normalize())
                .collect(),
            initial_errors,
            debug_data: vec![BeaconDebugData::default(); n],
            estimator,
            has_pose_estimate: false,
            target_to_body,
            setup,
        };
        target.beacons = target.initial_beacon_states();
        target.verify_invariants();
        Ok(target)
    }

    fn initial_beacon_states(&self) -> Vec<BeaconState> {
        self.setup
            .positions
            .iter()
            .zip(&self.fixed)
            .zip(&self.initial_errors)
            .map(|((position, &fixed), &error)| {
                let variance = if fixed { 0.0 } else { error * error };
                BeaconState::new(position, variance)
            })
            .collect()
    }

    /// Panics if the per-beacon tables have drifted apart.
    pub fn verify_invariants(&self) {
        let n = self.beacons.len();
        assert!(
            self.measurement_variance.len() == n
                && self.fixed.len() == n
                && self.emission_direction.len() == n
                && self.initial_errors.len() == n
                && self.debug_data.len() == n,
            "per-beacon tables of a target must all have {n} entries"
        );
    }

    pub fn num_beacons(&self) -> usize {
        self.beacons.len()
    }

    pub fn target_to_body(&self) -> &Isometry3<f64> {
        &self.target_to_body
    }

    pub fn setup(&self) -> &TargetSetup {
        &self.setup
    }

    pub fn beacons(&self) -> &[BeaconState] {
        &self.beacons
    }

    pub fn is_fixed(&self, id: ZeroBasedBeaconId) -> Option<bool> {
        self.fixed.get(id.index()?).copied()
    }

    /// Runs the estimator over one frame's measurements for this target.
    ///
    /// `body` must already be predicted to the frame time. Returns whether
    /// any correction was applied.
    pub fn update_pose_estimate(
        &mut self,
        camera: &CameraParameters,
        leds: &mut [LedMeasurement],
        video_dt: f64,
        body: &mut BodyState,
    ) -> bool {
        self.debug_data.iter_mut().for_each(BeaconDebugData::reset);
        let got_measurement = self.estimator.estimate(EstimatorInput {
            camera,
            leds,
            beacons: TargetBeacons {
                states: &mut self.beacons,
                measurement_variance: &self.measurement_variance,
                fixed: &self.fixed,
                emission_direction: &self.emission_direction,
                target_to_body: &self.target_to_body,
            },
            body,
            video_dt,
            debug: Some(self.debug_data.as_mut_slice()),
        });
        if got_measurement {
            self.has_pose_estimate = true;
        }
        got_measurement
    }

    pub fn beacon_debug_data(&self) -> &[BeaconDebugData] {
        &self.debug_data
    }

    /// Current (possibly autocalibrated) position of a beacon, target frame.
    pub fn beacon_autocalib_position(&self, id: ZeroBasedBeaconId) -> Option<Point3<f64>> {
        self.beacons.get(id.index()?).map(BeaconState::position)
    }

    /// Per-axis variance of a beacon's position estimate.
    pub fn beacon_autocalib_variance(&self, id: ZeroBasedBeaconId) -> Option<Vector3<f64>> {
        self.beacons.get(id.index()?).map(BeaconState::variance)
    }

    /// Sticky: set by the first frame that applied a correction.
    pub fn has_pose_estimate(&self) -> bool {
        self.has_pose_estimate
    }

    pub fn health(&self) -> TrackingHealth {
        self.estimator.health()
    }

    /// Clears the estimator's health history, keeping the pose estimate flag.
    pub fn reset_health(&mut self) {
        self.estimator.reset();
    }

    /// Forgets that the target ever produced a pose and clears health history.
    pub fn reset_tracking(&mut self) {
        self.estimator.reset();
        self.has_pose_estimate = false;
    }

    /// Overwrites the beacon position estimates, keeping their covariances.
    pub fn recalibrate(&mut self, positions: &[Point3<f64>]) -> Result<(), TargetError> {
        if positions.len() != self.beacons.len() {
            return Err(TargetError::LengthMismatch {
                table: "positions",
                expected: self.beacons.len(),
                found: positions.len(),
            });
        }
        for (beacon, position) in self.beacons.iter_mut().zip(positions) {
            beacon.set_position(position);
        }
        self.verify_invariants();
        Ok(())
    }

    /// Restores the beacon positions and uncertainties of the original setup.
    pub fn reset_autocalibration(&mut self) {
        self.beacons = self.initial_beacon_states();
        self.verify_invariants();
    }

    /// Largest distance between any autocalibrated beacon and its setup
    /// position.
    pub fn max_autocalibration_offset(&self) -> f64 {
        self.beacons
            .iter()
            .zip(&self.setup.positions)
            .map(|(beacon, original)| (beacon.position() - *original).norm())
            .fold(0.0, f64::max)
    }

    /// Covariance of one beacon's position estimate.
    pub fn beacon_covariance(&self, id: ZeroBasedBeaconId) -> Option<&Matrix3<f64>> {
        self.beacons.get(id.index()?).map(BeaconState::covariance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point2;
    use proptest::prelude::*;

    fn square_setup() -> TargetSetup {
        let positions = vec![
            Point3::new(-0.05, -0.05, 0.0),
            Point3::new(0.05, -0.05, 0.0),
            Point3::new(0.05, 0.05, 0.0),
            Point3::new(-0.05, 0.05, 0.0),
        ];
        TargetSetup::new(positions, vec![-Vector3::z(); 4], 3.0)
    }

    #[test]
    fn fixed_beacons_get_zero_covariance() {
        let setup = square_setup().mark_fixed_by(|id| id == OneBasedBeaconId::new(1));
        let params = ConfigParams::default();
        let target = TrackedBodyTarget::new(setup, Isometry3::identity(), &params).unwrap();
        let first = ZeroBasedBeaconId::new(0);
        let second = ZeroBasedBeaconId::new(1);
        assert_eq!(target.is_fixed(first), Some(true));
        assert_eq!(target.is_fixed(second), Some(false));
        assert_eq!(target.beacon_autocalib_variance(first), Some(Vector3::zeros()));
        let expected = params.initial_beacon_error.powi(2);
        assert_abs_diff_eq!(
            target.beacon_autocalib_variance(second).unwrap(),
            Vector3::repeat(expected)
        );
        assert_eq!(target.beacon_autocalib_position(ZeroBasedBeaconId::empty()), None);
        assert_eq!(target.beacon_autocalib_position(ZeroBasedBeaconId::new(9)), None);
    }

    #[test]
    fn recalibration_keeps_cardinality() {
        let params = ConfigParams::default();
        let mut target =
            TrackedBodyTarget::new(square_setup(), Isometry3::identity(), &params).unwrap();
        let moved: Vec<_> = target
            .setup()
            .positions
            .iter()
            .map(|p| *p + Vector3::new(0.0, 0.0, 0.01))
            .collect();
        target.recalibrate(&moved).unwrap();
        assert_abs_diff_eq!(target.max_autocalibration_offset(), 0.01, epsilon = 1e-12);
        assert!(matches!(
            target.recalibrate(&moved[..3]),
            Err(TargetError::LengthMismatch { expected: 4, found: 3, .. })
        ));
        target.reset_autocalibration();
        assert_eq!(target.max_autocalibration_offset(), 0.0);
        assert_eq!(target.num_beacons(), 4);
    }

    #[test]
    fn successful_update_sets_sticky_pose_flag() {
        let params = ConfigParams::default();
        let mut target =
            TrackedBodyTarget::new(square_setup(), Isometry3::identity(), &params).unwrap();
        let camera = CameraParameters::new(500.0, Point2::new(320.0, 240.0), (640, 480));
        let mut body = BodyState::new(&Isometry3::translation(0.0, 0.0, 0.5), 1e-2);

        let mut leds: Vec<_> = (0..4)
            .map(|i| {
                let id = ZeroBasedBeaconId::from_index(i);
                let p = body.pose() * target.beacon_autocalib_position(id).unwrap();
                LedMeasurement::new(camera.project(&p).unwrap(), 5.0, id)
            })
            .collect();
        assert!(!target.has_pose_estimate());
        assert!(target.update_pose_estimate(&camera, &mut leds, 0.0, &mut body));
        assert!(target.has_pose_estimate());
        assert!(target.beacon_debug_data().iter().all(|d| d.seen));

        // An empty frame leaves the flag set but clears the debug snapshots.
        assert!(!target.update_pose_estimate(&camera, &mut [], 1.0 / 60.0, &mut body));
        assert!(target.has_pose_estimate());
        assert!(target.beacon_debug_data().iter().all(|d| !d.seen));
        assert_eq!(target.health(), TrackingHealth::Functioning);

        target.reset_tracking();
        assert!(!target.has_pose_estimate());
    }

    #[test]
    fn rejects_degenerate_emission_direction() {
        let mut setup = square_setup();
        setup.emission_directions[2] = Vector3::zeros();
        assert_eq!(
            setup.validate(),
            Err(TargetError::DegenerateEmissionDirection { index: 2 })
        );
    }

    proptest! {
        #[test]
        fn mismatched_tables_are_rejected(
            n in 1usize..12,
            emissions in 1usize..12,
            variances in 1usize..12,
            fixed in 1usize..12,
        ) {
            let setup = TargetSetup {
                positions: vec![Point3::origin(); n],
                emission_directions: vec![-Vector3::z(); emissions],
                measurement_variances: vec![1.0; variances],
                fixed: vec![false; fixed],
                initial_errors: None,
            };
            let result = TrackedBodyTarget::new(setup, Isometry3::identity(), &ConfigParams::default());
            let consistent = emissions == n && variances == n && fixed == n;
            prop_assert_eq!(result.is_ok(), consistent);
            match result {
                Ok(target) => {
                    prop_assert_eq!(target.num_beacons(), n);
                    prop_assert_eq!(target.beacon_debug_data().len(), n);
                }
                Err(err) => {
                    let is_length_mismatch = matches!(err, TargetError::LengthMismatch { .. });
                    prop_assert!(is_length_mismatch);
                }
            }
        }

        #[test]
        fn recalibration_preserves_table_lengths(n in 1usize..12, m in 0usize..12) {
            let setup = TargetSetup::new(vec![Point3::origin(); n], vec![-Vector3::z(); n], 1.0);
            let mut target =
                TrackedBodyTarget::new(setup, Isometry3::identity(), &ConfigParams::default()).unwrap();
            let result = target.recalibrate(&vec![Point3::new(0.0, 0.0, 1.0); m]);
            prop_assert_eq!(result.is_ok(), m == n);
            prop_assert_eq!(target.num_beacons(), n);
            target.verify_invariants();
        }
    }
}
