// vbtracker_sim/src/simulation/core/runner.rs

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Isometry3;
use tracing::{debug, info, warn};

use super::error::SimError;
use super::prng::SimulationRng;
use crate::simulation::config::ScenarioConfig;
use crate::simulation::sensors::{SimulatedCamera, SimulatedImu};
use crate::simulation::world::{Constellation, Trajectory};
use vbtracker_core::estimation::TrackingHealth;
use vbtracker_core::messages::{FrameInput, FrameReport, LedMeasurement};
use vbtracker_core::tracking::TrackingSystem;
use vbtracker_core::types::{BodyId, ZeroBasedBeaconId};

/// What happened in one simulated frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame: usize,
    pub report: FrameReport,
    pub visible: usize,
    pub used: usize,
    pub misidentified: usize,
    pub position_error: f64,
    pub rotation_error: f64,
}

/// End-of-run statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: usize,
    pub rms_position_error: f64,
    pub max_rotation_error: f64,
    pub resets: usize,
    pub final_health: TrackingHealth,
    /// Largest distance between an assumed beacon position and the truth,
    /// before and after the run.
    pub initial_calibration_error: f64,
    pub final_calibration_error: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, RMS position error {:.2} mm, max rotation error {:.3} deg, {} resets, \
             final health {:?}, worst beacon error {:.2} mm -> {:.2} mm",
            self.frames,
            self.rms_position_error * 1e3,
            self.max_rotation_error.to_degrees(),
            self.resets,
            self.final_health,
            self.initial_calibration_error * 1e3,
            self.final_calibration_error * 1e3,
        )
    }
}

/// # Simulation
/// Drives a tracking system with synthetic data and plays the part of the
/// re-acquisition controller: the body is seeded from ground truth at start
/// and whenever the tracker asks for a reset.
#[derive(Debug)]
pub struct Simulation {
    config: ScenarioConfig,
    rng: SimulationRng,
    system: TrackingSystem,
    body: BodyId,
    trajectory: Trajectory,
    constellation: Constellation,
    target_to_body: Isometry3<f64>,
    camera: SimulatedCamera,
    imu: Option<SimulatedImu>,
    frame: usize,
    pending_reset: bool,
    resets: usize,
    squared_position_error: f64,
    max_rotation_error: f64,
    initial_calibration_error: f64,
}

impl Simulation {
    pub fn new(config: ScenarioConfig) -> Result<Self, SimError> {
        let mut rng = SimulationRng::new(config.simulation.seed);
        let constellation = Constellation::generate(&config.target);
        let setup = constellation.assumed_setup(&config.target, &mut rng.0)?;
        let initial_calibration_error = worst_distance(&setup.positions, &constellation);
        let target_to_body = Isometry3::identity();

        let mut system = TrackingSystem::new(config.tracker.clone())?;
        let body = system.create_tracked_body();
        let trajectory = Trajectory::new(&config.motion);
        let imu = if config.simulation.use_imu {
            Some(SimulatedImu::new(&config.noise)?)
        } else {
            None
        };
        {
            let tracked = system
                .body_mut(body)
                .ok_or(SimError::Invalid {
                    field: "simulation",
                    reason: "freshly created body is missing".into(),
                })?;
            tracked.create_target(target_to_body, setup)?;
            if imu.is_some() {
                tracked.create_integrated_imu()?;
            }
            tracked.reset_pose(&trajectory.pose_at(0.0));
        }
        info!(
            beacons = constellation.len(),
            imu = imu.is_some(),
            "Simulation set up"
        );

        Ok(Self {
            camera: SimulatedCamera::new(config.camera.to_parameters(), &config.noise)?,
            config,
            rng,
            system,
            body,
            trajectory,
            constellation,
            target_to_body,
            imu,
            frame: 0,
            pending_reset: false,
            resets: 0,
            squared_position_error: 0.0,
            max_rotation_error: 0.0,
            initial_calibration_error,
        })
    }

    pub fn system(&self) -> &TrackingSystem {
        &self.system
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.config.simulation.frames
    }

    /// Simulates the next video frame (preceded by IMU reports, if enabled).
    pub fn step(&mut self) -> FrameOutcome {
        let t = self.frame as f64 / self.config.simulation.frame_rate;
        let truth = self.trajectory.pose_at(t);

        if let Some(imu) = &self.imu {
            let reports = imu.sample(
                t,
                &truth.rotation,
                &self.trajectory.angular_velocity_at(t),
                &mut self.rng.0,
            );
            for report in &reports {
                self.system.process_imu(self.body, report);
            }
        }

        let leds = self.camera.observe(
            &truth,
            &self.target_to_body,
            &self.constellation,
            &mut self.rng.0,
        );
        let visible = leds.len();
        if self.pending_reset && leds.iter().any(LedMeasurement::is_identified) {
            self.reset_body(&truth);
        }

        let mut input = FrameInput {
            timestamp: t,
            camera: self.camera.params().clone(),
            measurements: BTreeMap::from([(self.body, leds)]),
        };
        let report = self.system.process_frame(&mut input);
        let leds = input.measurements.remove(&self.body).unwrap_or_default();
        let used = leds.iter().filter(|led| led.is_used()).count();
        let misidentified = leds.iter().filter(|led| led.is_misidentified()).count();

        let (position_error, rotation_error) = self.pose_error(&truth);
        self.squared_position_error += position_error * position_error;
        self.max_rotation_error = self.max_rotation_error.max(rotation_error);

        let health = report
            .bodies
            .iter()
            .find(|b| b.body == self.body)
            .map_or(TrackingHealth::Functioning, |b| b.health);
        match health {
            TrackingHealth::NeedsResetNow => {
                warn!(frame = self.frame, "tracker diverged, reseeding from ground truth");
                self.reset_body(&truth);
            }
            TrackingHealth::ResetWhenBeaconsSeen => self.pending_reset = true,
            TrackingHealth::Functioning => {}
        }

        debug!(
            frame = self.frame,
            visible,
            used,
            misidentified,
            position_error_mm = position_error * 1e3,
            rotation_error_deg = rotation_error.to_degrees(),
            "frame"
        );
        let outcome = FrameOutcome {
            frame: self.frame,
            report,
            visible,
            used,
            misidentified,
            position_error,
            rotation_error,
        };
        self.frame += 1;
        outcome
    }

    /// Runs every remaining frame and summarizes.
    pub fn run(&mut self) -> RunSummary {
        while !self.is_finished() {
            self.step();
        }
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        let frames = self.frame;
        let rms_position_error = if frames == 0 {
            0.0
        } else {
            (self.squared_position_error / frames as f64).sqrt()
        };
        RunSummary {
            frames,
            rms_position_error,
            max_rotation_error: self.max_rotation_error,
            resets: self.resets,
            final_health: self
                .system
                .body(self.body)
                .map_or(TrackingHealth::Functioning, |b| b.health()),
            initial_calibration_error: self.initial_calibration_error,
            final_calibration_error: self.calibration_error(),
        }
    }

    /// Worst distance between an autocalibrated beacon and its true position.
    pub fn calibration_error(&self) -> f64 {
        let Some(target) = self.system.body(self.body).and_then(|b| b.target()) else {
            return 0.0;
        };
        let estimated: Vec<_> = (0..target.num_beacons())
            .filter_map(|i| target.beacon_autocalib_position(ZeroBasedBeaconId::from_index(i)))
            .collect();
        worst_distance(&estimated, &self.constellation)
    }

    fn pose_error(&self, truth: &Isometry3<f64>) -> (f64, f64) {
        let Some(body) = self.system.body(self.body) else {
            return (f64::INFINITY, f64::INFINITY);
        };
        let estimate = body.state().pose();
        (
            (estimate.translation.vector - truth.translation.vector).norm(),
            estimate.rotation.angle_to(&truth.rotation),
        )
    }

    fn reset_body(&mut self, truth: &Isometry3<f64>) {
        if let Some(body) = self.system.body_mut(self.body) {
            body.reset_pose(truth);
        }
        self.pending_reset = false;
        self.resets += 1;
    }
}

fn worst_distance(positions: &[nalgebra::Point3<f64>], truth: &Constellation) -> f64 {
    positions
        .iter()
        .zip(&truth.positions)
        .map(|(estimate, actual)| (estimate - actual).norm())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ScenarioConfig {
        let mut config = ScenarioConfig::default();
        config.simulation.seed = Some(42);
        config.simulation.frames = 300;
        config
    }

    #[test]
    fn tracks_the_orbiting_ring() {
        let mut sim = Simulation::new(scenario()).unwrap();
        let summary = sim.run();
        assert_eq!(summary.frames, 300);
        assert!(summary.rms_position_error < 0.02, "{summary}");
        assert!(summary.max_rotation_error < 0.2, "{summary}");
        assert_eq!(summary.final_health, TrackingHealth::Functioning);
        assert!(summary.final_calibration_error.is_finite());
        assert!(sim.system().body(sim.body()).unwrap().has_pose_estimate());
    }

    #[test]
    fn tracks_with_an_imu_attached() {
        let mut config = scenario();
        config.simulation.use_imu = true;
        let mut sim = Simulation::new(config).unwrap();
        let summary = sim.run();
        assert!(summary.rms_position_error < 0.02, "{summary}");
        assert_eq!(summary.final_health, TrackingHealth::Functioning);
    }

    #[test]
    fn same_seed_same_run() {
        let first = Simulation::new(scenario()).unwrap().run();
        let second = Simulation::new(scenario()).unwrap().run();
        assert_eq!(first, second);
    }

    #[test]
    fn steps_report_the_tracked_body() {
        let mut sim = Simulation::new(scenario()).unwrap();
        let outcome = sim.step();
        assert_eq!(outcome.frame, 0);
        assert_eq!(outcome.report.bodies.len(), 1);
        assert!(outcome.visible > 0);
        assert!(outcome.used <= outcome.visible);
    }
}
