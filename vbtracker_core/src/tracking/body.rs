// vbtracker_core/src/tracking/body.rs

use nalgebra::Isometry3;

use super::imu::TrackedBodyImu;
use super::target::{TargetSetup, TrackedBodyTarget};
use crate::camera::CameraParameters;
use crate::config::ConfigParams;
use crate::error::BodyError;
use crate::estimation::{kalman, TrackingHealth};
use crate::messages::{BodyPoseReport, ImuReport, LedMeasurement};
use crate::models::process::DampedConstantVelocityProcess;
use crate::state::BodyState;
use crate::types::BodyId;

/// # Tracked Body
/// A rigid body with one pose state, fed by at most one video target and at
/// most one integrated IMU.
#[derive(Debug, Clone)]
pub struct TrackedBody {
    id: BodyId,
    initial_variance: f64,
    params: ConfigParams,
    state: BodyState,
    process: DampedConstantVelocityProcess,
    /// Time the state was last predicted or corrected to.
    state_time: Option<f64>,
    last_video_time: Option<f64>,
    target: Option<TrackedBodyTarget>,
    imu: Option<TrackedBodyImu>,
}

impl TrackedBody {
    pub fn new(id: BodyId, params: &ConfigParams) -> Self {
        Self {
            id,
            initial_variance: params.initial_body_variance,
            params: params.clone(),
            state: BodyState::new(&Isometry3::identity(), params.initial_body_variance),
            process: DampedConstantVelocityProcess::from_params(params),
            state_time: None,
            last_video_time: None,
            target: None,
            imu: None,
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn state(&self) -> &BodyState {
        &self.state
    }

    pub fn state_time(&self) -> Option<f64> {
        self.state_time
    }

    /// Attaches the video target described by `setup`.
    pub fn create_target(
        &mut self,
        target_to_body: Isometry3<f64>,
        setup: TargetSetup,
    ) -> Result<&mut TrackedBodyTarget, BodyError> {
        if self.target.is_some() {
            return Err(BodyError::TargetAlreadyAttached);
        }
        let target = TrackedBodyTarget::new(setup, target_to_body, &self.params)?;
        Ok(self.target.insert(target))
    }

    pub fn create_integrated_imu(&mut self) -> Result<&mut TrackedBodyImu, BodyError> {
        if self.imu.is_some() {
            return Err(BodyError::ImuAlreadyAttached);
        }
        Ok(self.imu.insert(TrackedBodyImu::new(&self.params)))
    }

    pub fn target(&self) -> Option<&TrackedBodyTarget> {
        self.target.as_ref()
    }

    pub fn target_mut(&mut self) -> Option<&mut TrackedBodyTarget> {
        self.target.as_mut()
    }

    pub fn imu(&self) -> Option<&TrackedBodyImu> {
        self.imu.as_ref()
    }

    /// True once any attached sensor has produced a pose.
    pub fn has_pose_estimate(&self) -> bool {
        self.target
            .as_ref()
            .is_some_and(TrackedBodyTarget::has_pose_estimate)
            || self.imu.as_ref().is_some_and(TrackedBodyImu::has_pose_estimate)
    }

    /// Predicts the state forward to `timestamp`. Older timestamps leave the
    /// state where it is.
    pub fn predict_to(&mut self, timestamp: f64) {
        match self.state_time {
            Some(previous) if timestamp > previous => {
                kalman::predict(&mut self.state, &self.process, timestamp - previous);
                self.state_time = Some(timestamp);
            }
            Some(_) => {}
            None => self.state_time = Some(timestamp),
        }
    }

    /// Runs one video frame through the target. `None` if no target is
    /// attached, otherwise whether a correction was applied.
    pub fn incorporate_video_frame(
        &mut self,
        timestamp: f64,
        camera: &CameraParameters,
        leds: &mut [LedMeasurement],
    ) -> Option<bool> {
        if self.target.is_none() {
            return None;
        }
        self.predict_to(timestamp);
        let video_dt = self
            .last_video_time
            .map_or(0.0, |previous| (timestamp - previous).max(0.0));
        self.last_video_time = Some(timestamp);
        let target = self.target.as_mut()?;
        Some(target.update_pose_estimate(camera, leds, video_dt, &mut self.state))
    }

    /// Applies an IMU report. `false` if no IMU is attached or the correction
    /// failed.
    pub fn incorporate_imu(&mut self, report: &ImuReport) -> bool {
        if self.imu.is_none() {
            return false;
        }
        self.predict_to(report.timestamp());
        match self.imu.as_mut() {
            Some(imu) => imu.update(report, &mut self.state),
            None => false,
        }
    }

    pub fn pose_report(&self) -> BodyPoseReport {
        BodyPoseReport {
            timestamp: self.state_time.unwrap_or(0.0),
            pose: self.state.pose(),
            linear_velocity: self.state.linear_velocity(),
            angular_velocity: self.state.angular_velocity(),
            pose_covariance: self.state.pose_covariance(),
        }
    }

    /// Health of the video target; a body without one is always functioning.
    pub fn health(&self) -> TrackingHealth {
        self.target
            .as_ref()
            .map_or(TrackingHealth::Functioning, TrackedBodyTarget::health)
    }

    /// Reseeds the body at `pose` (e.g. from an external re-acquisition step)
    /// with fresh uncertainty and velocities, and clears the target's health
    /// history.
    pub fn reset_pose(&mut self, pose: &Isometry3<f64>) {
        self.state = BodyState::new(pose, self.initial_variance);
        if let Some(target) = self.target.as_mut() {
            target.reset_health();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Point2, Point3, UnitQuaternion, Vector3};

    fn setup() -> TargetSetup {
        let positions = vec![
            Point3::new(-0.04, -0.03, 0.0),
            Point3::new(0.04, -0.03, 0.0),
            Point3::new(0.04, 0.03, 0.01),
            Point3::new(-0.04, 0.03, 0.0),
            Point3::new(0.0, 0.0, 0.02),
        ];
        TargetSetup::new(positions, vec![-Vector3::z(); 5], 3.0).with_fixed(vec![true; 5])
    }

    #[test]
    fn sensors_attach_once() {
        let mut body = TrackedBody::new(BodyId(0), &ConfigParams::default());
        assert!(body.create_target(Isometry3::identity(), setup()).is_ok());
        assert_eq!(
            body.create_target(Isometry3::identity(), setup()).err(),
            Some(BodyError::TargetAlreadyAttached)
        );
        assert!(body.create_integrated_imu().is_ok());
        assert_eq!(
            body.create_integrated_imu().err(),
            Some(BodyError::ImuAlreadyAttached)
        );
    }

    #[test]
    fn bad_setup_is_reported() {
        let mut body = TrackedBody::new(BodyId(0), &ConfigParams::default());
        let mut bad = setup();
        bad.fixed.pop();
        assert!(matches!(
            body.create_target(Isometry3::identity(), bad),
            Err(BodyError::Target(_))
        ));
        assert!(body.target().is_none());
    }

    #[test]
    fn prediction_is_monotonic_in_time() {
        let mut body = TrackedBody::new(BodyId(0), &ConfigParams::default());
        body.reset_pose(&Isometry3::translation(0.0, 0.0, 1.0));
        body.predict_to(1.0);
        let after_first = body.state().clone();
        body.predict_to(0.5);
        assert_eq!(body.state(), &after_first);
        assert_eq!(body.state_time(), Some(1.0));
        body.predict_to(1.5);
        assert!(body.state().covariance()[(0, 0)] > after_first.covariance()[(0, 0)]);
    }

    #[test]
    fn video_frames_refine_an_offset_pose() {
        let params = ConfigParams::default();
        let mut body = TrackedBody::new(BodyId(0), &params);
        body.create_target(Isometry3::identity(), setup()).unwrap();
        let truth = Isometry3::from_parts(
            Vector3::new(0.01, -0.02, 0.6).into(),
            UnitQuaternion::from_euler_angles(0.05, -0.04, 0.1),
        );
        body.reset_pose(&Isometry3::translation(0.0, 0.0, 0.6));

        let camera = CameraParameters::new(600.0, Point2::new(320.0, 240.0), (640, 480));
        let positions = setup().positions;
        assert!(!body.has_pose_estimate());
        for frame in 0..60 {
            let mut leds: Vec<_> = positions
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let pixel = camera.project(&(truth * p)).unwrap();
                    LedMeasurement::new(pixel, 4.0, (i as i32).into())
                })
                .collect();
            let t = frame as f64 / 60.0;
            assert_eq!(body.incorporate_video_frame(t, &camera, &mut leds), Some(true));
        }
        assert!(body.has_pose_estimate());
        let report = body.pose_report();
        assert_abs_diff_eq!(
            report.pose.translation.vector,
            truth.translation.vector,
            epsilon = 1e-2
        );
        assert!(report.pose.rotation.angle_to(&truth.rotation) < 0.03);
        assert_eq!(body.health(), TrackingHealth::Functioning);
    }

    #[test]
    fn imu_requires_attachment() {
        let mut body = TrackedBody::new(BodyId(0), &ConfigParams::default());
        let report = ImuReport::AngularVelocity {
            timestamp: 0.1,
            angular_velocity: Vector3::zeros(),
        };
        assert!(!body.incorporate_imu(&report));
        body.create_integrated_imu().unwrap();
        assert!(body.incorporate_imu(&report));
        assert_eq!(body.state_time(), Some(0.1));
    }
}
