// vbtracker_core/src/config.rs

use serde::Deserialize;

use crate::error::ConfigError;

/// # ConfigParams
/// Tuning parameters for the video/inertial tracker.
///
/// Loading these from disk is the caller's job; every field falls back to its
/// default when missing from the source document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigParams {
    // --- Measurement triage ---
    /// Drop bright (saturated) blobs when enough dim beacons are in view.
    pub should_skip_bright_leds: bool,
    /// Variance multiplier applied to bright blobs that are still used.
    pub bright_led_variance_penalty: f64,
    /// Height/width ratio bound for the bounding-box plausibility band.
    /// The band is built as `[min(r, 1/r), max(r, 1/r)]`.
    pub bounding_box_filter_ratio: f64,
    /// Reject measurements that fail the bounding-box test.
    pub enforce_bounding_box_filter: bool,
    /// Apply corrections in ascending beacon-id order instead of input order.
    pub sort_measurements_by_id: bool,

    // --- Per-beacon correction ---
    /// Residual norm (pixels) above which a measurement counts as bad.
    pub max_residual: f64,
    /// Largest acceptable camera-frame z component of a rotated emission
    /// direction. Must be negative; values closer to zero admit more oblique
    /// beacons.
    pub max_z_component: f64,
    /// Variance multiplier for measurements whose residual exceeds `max_residual`.
    pub high_residual_variance_penalty: f64,
    /// Global scale on every beacon's measurement variance.
    pub measurement_variance_scale_factor: f64,
    /// Process-noise autocorrelation for beacons under autocalibration.
    pub beacon_process_noise: f64,
    /// Initial standard error of a beacon position under autocalibration.
    pub initial_beacon_error: f64,

    // --- Body process model ---
    /// Fraction of linear velocity retained after one second.
    pub linear_velocity_decay_coefficient: f64,
    /// Fraction of angular velocity retained after one second.
    pub angular_velocity_decay_coefficient: f64,
    /// White-noise acceleration autocorrelation: 3 translational then 3 rotational.
    pub process_noise_autocorrelation: [f64; 6],
    /// Initial variance on every body state component when tracking (re)starts.
    pub initial_body_variance: f64,

    // --- IMU ---
    /// Variance (rad^2) of an absolute orientation report.
    pub imu_orientation_variance: f64,
    /// Variance ((rad/s)^2) of an angular-velocity report.
    pub imu_angular_velocity_variance: f64,

    /// Log every rejected beacon at debug level.
    pub extra_verbose: bool,
}

impl Default for ConfigParams {
    fn default() -> Self {
        Self {
            should_skip_bright_leds: false,
            bright_led_variance_penalty: 8.0,
            bounding_box_filter_ratio: 5.0 / 4.0,
            enforce_bounding_box_filter: false,
            sort_measurements_by_id: false,
            max_residual: 75.0,
            max_z_component: -0.3,
            high_residual_variance_penalty: 7.5,
            measurement_variance_scale_factor: 1.0,
            beacon_process_noise: 1e-9,
            initial_beacon_error: 1e-3,
            linear_velocity_decay_coefficient: 0.9,
            angular_velocity_decay_coefficient: 0.9,
            process_noise_autocorrelation: [1e-1, 1e-1, 1e-1, 5e-1, 5e-1, 5e-1],
            initial_body_variance: 1e-2,
            imu_orientation_variance: 1e-4,
            imu_angular_velocity_variance: 1e-3,
            extra_verbose: false,
        }
    }
}

impl ConfigParams {
    /// The bounding-box ratio band, smallest bound first.
    pub fn bounding_box_band(&self) -> (f64, f64) {
        let r = self.bounding_box_filter_ratio;
        let inv = 1.0 / r;
        if r < inv {
            (r, inv)
        } else {
            (inv, r)
        }
    }

    /// Checks value ranges that would otherwise produce NaNs deep inside the filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positives = [
            ("bright_led_variance_penalty", self.bright_led_variance_penalty),
            ("bounding_box_filter_ratio", self.bounding_box_filter_ratio),
            ("max_residual", self.max_residual),
            (
                "high_residual_variance_penalty",
                self.high_residual_variance_penalty,
            ),
            (
                "measurement_variance_scale_factor",
                self.measurement_variance_scale_factor,
            ),
            ("initial_beacon_error", self.initial_beacon_error),
            ("initial_body_variance", self.initial_body_variance),
            ("imu_orientation_variance", self.imu_orientation_variance),
            (
                "imu_angular_velocity_variance",
                self.imu_angular_velocity_variance,
            ),
        ];
        for (name, value) in positives {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if self.beacon_process_noise < 0.0 {
            return Err(ConfigError::NotPositive {
                name: "beacon_process_noise",
                value: self.beacon_process_noise,
            });
        }
        for value in self.process_noise_autocorrelation {
            if value < 0.0 {
                return Err(ConfigError::NotPositive {
                    name: "process_noise_autocorrelation",
                    value,
                });
            }
        }
        if !(-1.0..0.0).contains(&self.max_z_component) {
            return Err(ConfigError::ObliquenessOutOfRange(self.max_z_component));
        }
        let decays = [
            (
                "linear_velocity_decay_coefficient",
                self.linear_velocity_decay_coefficient,
            ),
            (
                "angular_velocity_decay_coefficient",
                self.angular_velocity_decay_coefficient,
            ),
        ];
        for (name, value) in decays {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::DecayOutOfRange { name, value });
            }
        }
        Ok(())
    }
}
