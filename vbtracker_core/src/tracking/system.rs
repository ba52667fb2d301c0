// vbtracker_core/src/tracking/system.rs

use std::ptr;

use tracing::{info, warn};

use super::body::TrackedBody;
use crate::config::ConfigParams;
use crate::error::ConfigError;
use crate::estimation::TrackingHealth;
use crate::messages::{BodyFrameReport, FrameInput, FrameReport, ImuReport};
use crate::types::BodyId;

/// # Tracking System
/// Owns the tracking parameters and every tracked body, and routes per-frame
/// video data and IMU reports to them.
#[derive(Debug, Clone)]
pub struct TrackingSystem {
    params: ConfigParams,
    bodies: Vec<TrackedBody>,
    /// Health reported for each body after its last video frame.
    last_health: Vec<TrackingHealth>,
}

impl TrackingSystem {
    pub fn new(params: ConfigParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            params,
            bodies: Vec::new(),
            last_health: Vec::new(),
        })
    }

    pub fn params(&self) -> &ConfigParams {
        &self.params
    }

    /// Adds a body with no sensors attached yet.
    pub fn create_tracked_body(&mut self) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(TrackedBody::new(id, &self.params));
        self.last_health.push(TrackingHealth::Functioning);
        id
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, id: BodyId) -> Option<&TrackedBody> {
        self.bodies.get(id.index())
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut TrackedBody> {
        self.bodies.get_mut(id.index())
    }

    pub fn bodies(&self) -> impl Iterator<Item = &TrackedBody> {
        self.bodies.iter()
    }

    /// Finds the id of a body owned by this system.
    pub fn id_for_body(&self, body: &TrackedBody) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|candidate| ptr::eq(candidate, body))
            .map(|index| BodyId(index as u32))
    }

    /// Runs one video frame through every body that has a target.
    ///
    /// Bodies without measurements this frame still get an (empty) update so
    /// that their starvation counters advance.
    pub fn process_frame(&mut self, frame: &mut FrameInput) -> FrameReport {
        for id in frame.measurements.keys() {
            if self.body(*id).and_then(TrackedBody::target).is_none() {
                warn!(body = %id, "dropping measurements for a body without a video target");
            }
        }

        let updated: Vec<BodyId> = self
            .bodies
            .iter()
            .filter(|body| body.target().is_some())
            .map(TrackedBody::id)
            .collect();

        let mut report = FrameReport {
            timestamp: frame.timestamp,
            bodies: Vec::with_capacity(updated.len()),
        };
        for id in updated {
            let mut no_leds = Vec::new();
            let leds = match frame.measurements.get_mut(&id) {
                Some(leds) => leds,
                None => &mut no_leds,
            };
            let Some(body) = self.bodies.get_mut(id.index()) else {
                unreachable!("body {id} was scheduled for an update but is not registered");
            };
            let Some(got_measurement) =
                body.incorporate_video_frame(frame.timestamp, &frame.camera, leds)
            else {
                unreachable!("body {id} was scheduled for an update but has no target");
            };
            let health = body.health();
            self.log_health_transition(id, health);
            report.bodies.push(BodyFrameReport {
                body: id,
                got_measurement,
                health,
            });
        }
        report
    }

    /// Routes an IMU report to `body`. `false` if the body is unknown, has no
    /// IMU, or the correction failed.
    pub fn process_imu(&mut self, body: BodyId, report: &ImuReport) -> bool {
        match self.body_mut(body) {
            Some(tracked) => tracked.incorporate_imu(report),
            None => {
                warn!(body = %body, "IMU report for an unknown body");
                false
            }
        }
    }

    fn log_health_transition(&mut self, id: BodyId, health: TrackingHealth) {
        let Some(previous) = self.last_health.get_mut(id.index()) else {
            return;
        };
        if *previous == health {
            return;
        }
        match health {
            TrackingHealth::NeedsResetNow => {
                warn!(body = %id, from = ?*previous, "tracking lost, reset needed now")
            }
            TrackingHealth::ResetWhenBeaconsSeen => {
                warn!(body = %id, from = ?*previous, "no beacons in view, reset when seen")
            }
            TrackingHealth::Functioning => {
                info!(body = %id, from = ?*previous, "tracking recovered")
            }
        }
        *previous = health;
    }
}
