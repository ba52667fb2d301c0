// vbtracker_core/src/estimation/scaat.rs

use tracing::debug;

use super::bounding_box::{check_bounding_box, BoundingBoxPlausibility};
use super::health::{HealthMonitor, TrackingHealth};
use super::kalman::{self, Innovation};
use super::{EstimatorInput, PoseEstimator};
use crate::config::ConfigParams;
use crate::models::measurement::{ImagePointMeasurement, Measurement};
use crate::models::process::ConstantBeaconProcess;
use crate::state::AugmentedState;

/// Bright blobs are skipped once the dim ones outnumber them by more than this.
const DIM_BEACON_CUTOFF_TO_SKIP_BRIGHTS: usize = 4;

/// What happened to the measurements of the most recent frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTally {
    pub identified: usize,
    pub bright: usize,
    /// Blobs whose bounding box passed the plausibility band.
    pub round: usize,
    pub skipped_bright: bool,
    pub good: usize,
    pub bad: usize,
    pub got_measurement: bool,
}

/// # SCAAT Kalman Pose Estimator
/// Refines a body pose (and the positions of the calibratable beacons) from
/// one frame of identified beacon observations, applying one 2D image
/// constraint at a time.
///
/// Each correction is applied to the body state immediately, so every beacon
/// is linearized about the state left behind by the previous one.
#[derive(Debug, Clone)]
pub struct ScaatKalmanPoseEstimator {
    should_skip_bright: bool,
    bright_penalty: f64,
    max_squared_residual: f64,
    max_z_component: f64,
    high_residual_variance_penalty: f64,
    measurement_variance_scale: f64,
    bounding_box_band: (f64, f64),
    enforce_bounding_box: bool,
    sort_by_id: bool,
    beacon_process: ConstantBeaconProcess,
    extra_verbose: bool,

    monitor: HealthMonitor,
    last_frame: FrameTally,
}

impl ScaatKalmanPoseEstimator {
    pub fn new(params: &ConfigParams) -> Self {
        Self {
            should_skip_bright: params.should_skip_bright_leds,
            bright_penalty: params.bright_led_variance_penalty,
            max_squared_residual: params.max_residual * params.max_residual,
            max_z_component: params.max_z_component,
            high_residual_variance_penalty: params.high_residual_variance_penalty,
            measurement_variance_scale: params.measurement_variance_scale_factor,
            bounding_box_band: params.bounding_box_band(),
            enforce_bounding_box: params.enforce_bounding_box_filter,
            sort_by_id: params.sort_measurements_by_id,
            beacon_process: ConstantBeaconProcess {
                noise_autocorrelation: params.beacon_process_noise,
            },
            extra_verbose: params.extra_verbose,
            monitor: HealthMonitor::new(),
            last_frame: FrameTally::default(),
        }
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn last_frame(&self) -> &FrameTally {
        &self.last_frame
    }
}

impl PoseEstimator for ScaatKalmanPoseEstimator {
    fn estimate(&mut self, input: EstimatorInput<'_>) -> bool {
        let EstimatorInput {
            camera,
            leds,
            beacons,
            body,
            video_dt,
            mut debug,
        } = input;

        // --- 1. Triage: no state is touched here ---
        let mut tally = FrameTally::default();
        for led in leds.iter().filter(|led| led.is_identified()) {
            tally.identified += 1;
            if led.bright {
                tally.bright += 1;
            }
            if check_bounding_box(led, self.bounding_box_band) == BoundingBoxPlausibility::Pass {
                tally.round += 1;
            }
        }
        tally.skipped_bright = self.should_skip_bright
            && tally.identified - tally.bright > DIM_BEACON_CUTOFF_TO_SKIP_BRIGHTS;
        self.monitor.record_identified_blobs(tally.identified);

        let camera = camera.undistorted();
        let mut order: Vec<usize> = (0..leds.len()).collect();
        if self.sort_by_id {
            order.sort_by_key(|&i| leds[i].id);
        }

        // --- 2. One correction per usable beacon ---
        for i in order {
            let led = &mut leds[i];
            let Some(id) = led.id.index() else {
                continue;
            };
            assert!(
                id < beacons.len(),
                "measurement for {} but the target only has {} beacons",
                led.id,
                beacons.len()
            );

            if let Some(slot) = debug.as_deref_mut().map(|d| &mut d[id]) {
                slot.seen = true;
                slot.measurement = led.location;
            }

            if tally.skipped_bright && led.bright {
                continue;
            }

            // An LED pointed straight at the camera emits along -Z.
            let rotation = body.combined_orientation() * beacons.target_to_body.rotation;
            let z_component = (rotation * beacons.emission_direction[id]).z;
            if z_component > 0.0 {
                if self.extra_verbose {
                    debug!(
                        beacon = %led.one_based_id(),
                        x = led.location.x,
                        y = led.location.y,
                        "rejecting beacon facing away from the camera"
                    );
                }
                led.mark_misidentified();
                tally.bad += 1;
                continue;
            } else if z_component > self.max_z_component {
                if self.extra_verbose {
                    debug!(beacon = %led.one_based_id(), z_component, "skipping oblique beacon");
                }
                continue;
            }

            if self.enforce_bounding_box
                && check_bounding_box(led, self.bounding_box_band) == BoundingBoxPlausibility::Fail
            {
                if self.extra_verbose {
                    debug!(beacon = %led.one_based_id(), "skipping non-round blob");
                }
                tally.bad += 1;
                continue;
            }

            if !beacons.fixed[id] {
                kalman::predict(&mut beacons.states[id], &self.beacon_process, video_dt);
            }

            let mut meas =
                ImagePointMeasurement::new(&camera, beacons.target_to_body, led.location);
            let mut augmented = AugmentedState::new(&mut *body, &mut beacons.states[id]);
            let Some(mut innovation) = Innovation::compute(&augmented, &meas) else {
                if self.extra_verbose {
                    debug!(beacon = %led.one_based_id(), "beacon predicted behind the camera");
                }
                continue;
            };
            led.mark_used();

            let mut local_penalty = 1.0;
            let squared_residual = innovation.residual.norm_squared();
            if squared_residual > self.max_squared_residual {
                if self.extra_verbose {
                    debug!(
                        beacon = %led.one_based_id(),
                        residual = squared_residual.sqrt(),
                        "high residual"
                    );
                }
                local_penalty *= self.high_residual_variance_penalty;
                tally.bad += 1;
            } else {
                tally.good += 1;
            }

            let novelty_penalty = 2f64.powi(i32::from(led.novelty));
            let bright_penalty = if led.bright { self.bright_penalty } else { 1.0 };
            let area = if led.area > 0.0 { led.area } else { 1.0 };
            let variance = local_penalty
                * self.measurement_variance_scale
                * novelty_penalty
                * bright_penalty
                * beacons.measurement_variance[id]
                / area;
            meas.set_variance(variance);
            innovation.noise = meas.covariance(&augmented);

            if let Some(slot) = debug.as_deref_mut().map(|d| &mut d[id]) {
                slot.residual.x = innovation.residual[0];
                slot.residual.y = innovation.residual[1];
                slot.variance = variance;
            }

            if kalman::apply_innovation(&mut augmented, &innovation) {
                tally.got_measurement = true;
            }
        }

        // --- 3. Health bookkeeping ---
        self.monitor.record_residual_tally(tally.good, tally.bad);
        self.monitor
            .record_utilization(tally.got_measurement, tally.identified);
        self.last_frame = tally;
        tally.got_measurement
    }

    fn health(&self) -> TrackingHealth {
        self.monitor.health()
    }

    fn reset(&mut self) {
        self.monitor.reset();
        self.last_frame = FrameTally::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraParameters;
    use crate::estimation::TargetBeacons;
    use crate::messages::{BeaconDebugData, BoundingBox, LedMeasurement};
    use crate::state::{BeaconState, BodyState};
    use crate::types::ZeroBasedBeaconId;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Isometry3, Point2, Point3, UnitQuaternion, Vector3};
    use std::f64::consts::PI;

    struct Fixture {
        camera: CameraParameters,
        body: BodyState,
        states: Vec<BeaconState>,
        variance: Vec<f64>,
        fixed: Vec<bool>,
        emission: Vec<Vector3<f64>>,
        target_to_body: Isometry3<f64>,
        debug: Vec<BeaconDebugData>,
    }

    impl Fixture {
        /// Beacons spread along x, one metre in front of the camera, all
        /// facing it.
        fn new(count: usize) -> Self {
            let states = (0..count)
                .map(|i| BeaconState::new(&Point3::new(0.02 * i as f64, 0.0, 0.0), 0.0))
                .collect();
            Self {
                camera: CameraParameters::new(600.0, Point2::new(320.0, 240.0), (640, 480)),
                body: BodyState::new(&Isometry3::translation(0.0, 0.0, 1.0), 1e-2),
                states,
                variance: vec![3.0; count],
                fixed: vec![true; count],
                emission: vec![-Vector3::z(); count],
                target_to_body: Isometry3::identity(),
                debug: vec![BeaconDebugData::default(); count],
            }
        }

        /// A perfectly fitting observation of beacon `index`.
        fn led(&self, index: usize) -> LedMeasurement {
            let p = self.body.pose() * (self.target_to_body * self.states[index].position());
            let location = self.camera.project(&p).unwrap();
            LedMeasurement::new(location, 4.0, ZeroBasedBeaconId::from_index(index))
        }

        fn run(&mut self, est: &mut ScaatKalmanPoseEstimator, leds: &mut [LedMeasurement]) -> bool {
            est.estimate(EstimatorInput {
                camera: &self.camera,
                leds,
                beacons: TargetBeacons {
                    states: &mut self.states,
                    measurement_variance: &self.variance,
                    fixed: &self.fixed,
                    emission_direction: &self.emission,
                    target_to_body: &self.target_to_body,
                },
                body: &mut self.body,
                video_dt: 1.0 / 60.0,
                debug: Some(&mut self.debug),
            })
        }
    }

    #[test]
    fn perfect_measurement_is_used() {
        let mut fx = Fixture::new(1);
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![fx.led(0)];
        assert!(fx.run(&mut est, &mut leds));
        assert!(leds[0].is_used());
        assert!(!leds[0].is_misidentified());
        assert_eq!(est.monitor().frames_without_utilization(), 0);
        assert_eq!(est.last_frame().good, 1);
        assert_abs_diff_eq!(fx.body.position().z, 1.0, epsilon = 1e-9);
        assert!(fx.debug[0].seen);
        assert_abs_diff_eq!(fx.debug[0].residual.norm(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fx.debug[0].variance, 3.0 / 4.0);
    }

    #[test]
    fn beacon_facing_away_is_misidentified() {
        let mut fx = Fixture::new(1);
        fx.body = BodyState::new(
            &Isometry3::from_parts(
                Vector3::new(0.0, 0.0, 1.0).into(),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI),
            ),
            1e-2,
        );
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![fx.led(0)];
        assert!(!fx.run(&mut est, &mut leds));
        assert!(leds[0].is_misidentified());
        assert!(!leds[0].is_used());
        assert_eq!(est.last_frame().bad, 1);
        assert_eq!(est.monitor().probation_frames(), 1);
        assert_eq!(est.monitor().frames_without_utilization(), 1);
    }

    #[test]
    fn oblique_beacon_is_skipped_silently() {
        let mut fx = Fixture::new(1);
        fx.emission[0] = Vector3::new(1.0, 0.0, -0.1).normalize();
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![fx.led(0)];
        assert!(!fx.run(&mut est, &mut leds));
        assert!(!leds[0].is_used());
        assert!(!leds[0].is_misidentified());
        assert_eq!((est.last_frame().good, est.last_frame().bad), (0, 0));
    }

    #[test]
    fn bright_beacons_skipped_when_enough_dim_ones() {
        let mut fx = Fixture::new(6);
        let params = ConfigParams {
            should_skip_bright_leds: true,
            ..ConfigParams::default()
        };
        let mut est = ScaatKalmanPoseEstimator::new(&params);
        let mut leds: Vec<_> = (0..6).map(|i| fx.led(i)).collect();
        leds[5].bright = true;
        assert!(fx.run(&mut est, &mut leds));
        assert!(est.last_frame().skipped_bright);
        assert!(!leds[5].is_used());
        assert!(leds[..5].iter().all(LedMeasurement::is_used));
        // Still recorded as seen.
        assert!(fx.debug[5].seen);
    }

    #[test]
    fn bright_beacons_kept_with_few_dim_ones() {
        let mut fx = Fixture::new(5);
        let params = ConfigParams {
            should_skip_bright_leds: true,
            ..ConfigParams::default()
        };
        let mut est = ScaatKalmanPoseEstimator::new(&params);
        let mut leds: Vec<_> = (0..5).map(|i| fx.led(i)).collect();
        leds[4].bright = true;
        fx.run(&mut est, &mut leds);
        assert!(!est.last_frame().skipped_bright);
        assert!(leds[4].is_used());
        assert_abs_diff_eq!(fx.debug[4].variance, 8.0 * 3.0 / 4.0);
    }

    #[test]
    fn high_residual_is_softened_and_counted_bad() {
        let mut fx = Fixture::new(1);
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut led = fx.led(0);
        led.location.x += 100.0;
        let mut leds = vec![led];
        assert!(fx.run(&mut est, &mut leds));
        assert!(leds[0].is_used());
        assert_eq!(est.last_frame().bad, 1);
        assert_abs_diff_eq!(fx.debug[0].residual.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fx.debug[0].variance, 7.5 * 3.0 / 4.0);
    }

    #[test]
    fn bounding_box_filter_is_opt_in() {
        let streak = |fx: &Fixture| fx.led(0).with_bounding_box(BoundingBox::new(1.0, 5.0));

        let mut fx = Fixture::new(1);
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![streak(&fx)];
        assert!(fx.run(&mut est, &mut leds));
        assert_eq!(est.last_frame().round, 0);

        let mut fx = Fixture::new(1);
        let params = ConfigParams {
            enforce_bounding_box_filter: true,
            ..ConfigParams::default()
        };
        let mut est = ScaatKalmanPoseEstimator::new(&params);
        let mut leds = vec![streak(&fx)];
        assert!(!fx.run(&mut est, &mut leds));
        assert!(!leds[0].is_used());
        assert_eq!(est.last_frame().bad, 1);
    }

    #[test]
    fn empty_frame_only_touches_counters() {
        let mut fx = Fixture::new(2);
        let before = fx.body.clone();
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        assert!(!fx.run(&mut est, &mut []));
        assert_eq!(fx.body, before);
        assert_eq!(est.monitor().frames_without_identified_blobs(), 1);
        assert_eq!(est.monitor().frames_without_utilization(), 0);
        assert_eq!(est.health(), TrackingHealth::Functioning);
    }

    #[test]
    fn unidentified_blobs_are_ignored() {
        let mut fx = Fixture::new(1);
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![LedMeasurement::new(
            Point2::new(320.0, 240.0),
            4.0,
            ZeroBasedBeaconId::empty(),
        )];
        assert!(!fx.run(&mut est, &mut leds));
        assert_eq!(est.monitor().frames_without_identified_blobs(), 1);
    }

    #[test]
    fn calibratable_beacon_absorbs_part_of_the_error() {
        let mut fx = Fixture::new(2);
        fx.fixed[1] = false;
        fx.states[1].covariance_mut().fill_with_identity();
        *fx.states[1].covariance_mut() *= 1e-4;
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());

        // The free beacon goes first so its residual is still the full offset.
        let mut leds = vec![fx.led(1), fx.led(0)];
        leds[0].location.x += 2.0;
        leds[1].location.x += 2.0;
        let fixed_before = fx.states[0].position();
        let free_before = fx.states[1].position();
        assert!(fx.run(&mut est, &mut leds));
        assert_eq!(fx.states[0].position(), fixed_before);
        assert!(fx.states[1].position().x > free_before.x);
    }

    #[test]
    fn novelty_doubles_variance_per_level() {
        let mut fx = Fixture::new(1);
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![fx.led(0).with_novelty(2)];
        assert!(fx.run(&mut est, &mut leds));
        assert_abs_diff_eq!(fx.debug[0].variance, 4.0 * 3.0 / 4.0);
    }

    /// Runs a reversed-order frame where both LEDs are offset by 2 px and
    /// returns the fixture afterwards. Beacon 0 is free, beacon 1 fixed.
    fn reversed_frame(sort_by_id: bool) -> Fixture {
        let mut fx = Fixture::new(2);
        fx.fixed[0] = false;
        fx.states[0].covariance_mut().fill_with_identity();
        *fx.states[0].covariance_mut() *= 1e-4;
        let params = ConfigParams {
            sort_measurements_by_id: sort_by_id,
            ..ConfigParams::default()
        };
        let mut est = ScaatKalmanPoseEstimator::new(&params);
        let mut leds = vec![fx.led(1), fx.led(0)];
        leds[0].location.x += 2.0;
        leds[1].location.x += 2.0;
        assert!(fx.run(&mut est, &mut leds));
        fx
    }

    #[test]
    fn sorting_by_id_corrects_lower_ids_first() {
        let start = Fixture::new(2).states[0].position();

        // Sorted: beacon 0 goes first and sees the whole offset.
        let sorted = reversed_frame(true);
        assert_abs_diff_eq!(sorted.debug[0].residual.x, 2.0, epsilon = 1e-9);

        // Input order: beacon 1 has already pulled the body towards the
        // measurements, so beacon 0 sees less.
        let unsorted = reversed_frame(false);
        assert!(unsorted.debug[0].residual.x < 2.0);

        let moved = |fx: &Fixture| (fx.states[0].position() - start).norm();
        assert!(moved(&sorted) > moved(&unsorted));
    }

    #[test]
    #[should_panic]
    fn out_of_range_id_is_a_precondition_violation() {
        let mut fx = Fixture::new(1);
        let mut est = ScaatKalmanPoseEstimator::new(&ConfigParams::default());
        let mut leds = vec![LedMeasurement::new(
            Point2::new(320.0, 240.0),
            4.0,
            ZeroBasedBeaconId::new(3),
        )];
        fx.run(&mut est, &mut leds);
    }
}
