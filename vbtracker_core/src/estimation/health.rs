// vbtracker_core/src/estimation/health.rs

use serde::Serialize;

/// Frames in probation before tracking is declared lost.
pub const MAX_PROBATION_FRAMES: u32 = 10;
/// Frames with identified beacons but no applied correction before tracking
/// is declared lost.
pub const MAX_FRAMES_WITHOUT_UTILIZATION: u32 = 10 * 5;
/// Frames without any identified beacon before a reset is requested.
pub const MAX_FRAMES_WITHOUT_BEACONS: u32 = 10;

/// The verdict on whether the current pose estimate can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TrackingHealth {
    #[default]
    Functioning,
    /// No beacons have been seen for a while; reset as soon as some return.
    ResetWhenBeaconsSeen,
    /// The estimate has diverged and must be discarded immediately.
    NeedsResetNow,
}

impl TrackingHealth {
    pub fn is_functioning(self) -> bool {
        self == TrackingHealth::Functioning
    }
}

/// Tracks per-frame evidence about estimator divergence.
///
/// Probation uses hysteresis: it is entered when `bad * 3 > good * 2` and
/// only left once `bad * 2 <= good`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthMonitor {
    probation_frames: u32,
    frames_without_utilization: u32,
    frames_without_identified_blobs: u32,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_identified_blobs(&mut self, identified: usize) {
        if identified == 0 {
            self.frames_without_identified_blobs += 1;
        } else {
            self.frames_without_identified_blobs = 0;
        }
    }

    /// Updates probation from this frame's residual tally.
    pub fn record_residual_tally(&mut self, good: usize, bad: usize) {
        let in_probation = self.probation_frames > 0;
        let staying = if in_probation {
            bad * 2 > good
        } else {
            bad * 3 > good * 2
        };
        if staying {
            self.probation_frames += 1;
        } else {
            self.probation_frames = 0;
        }
    }

    /// Counts frames where beacons were identified but none were used. Only
    /// an applied correction clears the streak; frames without identified
    /// beacons leave it as it is.
    pub fn record_utilization(&mut self, got_measurement: bool, identified: usize) {
        if got_measurement {
            self.frames_without_utilization = 0;
        } else if identified > 0 {
            self.frames_without_utilization += 1;
        }
    }

    pub fn health(&self) -> TrackingHealth {
        if self.probation_frames > MAX_PROBATION_FRAMES
            || self.frames_without_utilization > MAX_FRAMES_WITHOUT_UTILIZATION
        {
            TrackingHealth::NeedsResetNow
        } else if self.frames_without_identified_blobs > MAX_FRAMES_WITHOUT_BEACONS {
            TrackingHealth::ResetWhenBeaconsSeen
        } else {
            TrackingHealth::Functioning
        }
    }

    pub fn probation_frames(&self) -> u32 {
        self.probation_frames
    }

    pub fn frames_without_utilization(&self) -> u32 {
        self.frames_without_utilization
    }

    pub fn frames_without_identified_blobs(&self) -> u32 {
        self.frames_without_identified_blobs
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probation_has_hysteresis() {
        let mut monitor = HealthMonitor::new();
        // 2 good vs 3 bad: 9 > 4, enter
        monitor.record_residual_tally(2, 3);
        assert_eq!(monitor.probation_frames(), 1);
        // 3 good vs 2 bad would not enter, but 4 > 3 keeps us in
        monitor.record_residual_tally(3, 2);
        assert_eq!(monitor.probation_frames(), 2);
        // 4 good vs 2 bad: 4 > 4 is false, leave
        monitor.record_residual_tally(4, 2);
        assert_eq!(monitor.probation_frames(), 0);
        // 3 good vs 2 bad from outside: 6 > 6 is false, stay out
        monitor.record_residual_tally(3, 2);
        assert_eq!(monitor.probation_frames(), 0);
    }

    #[test]
    fn long_probation_needs_reset_now() {
        let mut monitor = HealthMonitor::new();
        for frame in 1..=MAX_PROBATION_FRAMES + 1 {
            monitor.record_identified_blobs(6);
            monitor.record_residual_tally(2, 4);
            monitor.record_utilization(true, 6);
            if frame <= MAX_PROBATION_FRAMES {
                assert_eq!(monitor.health(), TrackingHealth::Functioning);
            }
        }
        assert_eq!(monitor.health(), TrackingHealth::NeedsResetNow);
    }

    #[test]
    fn unused_beacons_need_reset_now() {
        let mut monitor = HealthMonitor::new();
        for _ in 0..=MAX_FRAMES_WITHOUT_UTILIZATION {
            monitor.record_identified_blobs(3);
            monitor.record_residual_tally(0, 0);
            monitor.record_utilization(false, 3);
        }
        assert_eq!(monitor.health(), TrackingHealth::NeedsResetNow);
        monitor.record_utilization(true, 3);
        assert_eq!(monitor.health(), TrackingHealth::Functioning);
    }

    #[test]
    fn missing_beacons_request_reset_when_seen() {
        let mut monitor = HealthMonitor::new();
        for _ in 0..=MAX_FRAMES_WITHOUT_BEACONS {
            monitor.record_identified_blobs(0);
            monitor.record_residual_tally(0, 0);
            monitor.record_utilization(false, 0);
        }
        assert_eq!(monitor.frames_without_identified_blobs(), MAX_FRAMES_WITHOUT_BEACONS + 1);
        assert_eq!(monitor.health(), TrackingHealth::ResetWhenBeaconsSeen);
        monitor.reset();
        assert_eq!(monitor.health(), TrackingHealth::Functioning);
    }

    #[test]
    fn blobless_frame_keeps_rejection_streak() {
        let mut monitor = HealthMonitor::new();
        for _ in 0..30 {
            monitor.record_identified_blobs(3);
            monitor.record_utilization(false, 3);
        }
        assert_eq!(monitor.frames_without_utilization(), 30);

        monitor.record_identified_blobs(0);
        monitor.record_utilization(false, 0);
        assert_eq!(monitor.frames_without_utilization(), 30);

        for _ in 0..MAX_FRAMES_WITHOUT_UTILIZATION - 30 + 1 {
            monitor.record_identified_blobs(3);
            monitor.record_utilization(false, 3);
        }
        assert_eq!(monitor.health(), TrackingHealth::NeedsResetNow);
    }
}
