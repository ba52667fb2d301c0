// vbtracker_sim/src/simulation/config/structs.rs

use nalgebra::Point2;
use serde::Deserialize;
use vbtracker_core::camera::CameraParameters;
use vbtracker_core::config::ConfigParams;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: Simulation,

    #[serde(default)]
    pub camera: Camera,

    /// Tracker tuning, passed straight to the core.
    #[serde(default)]
    pub tracker: ConfigParams,

    #[serde(default)]
    pub target: Target,

    #[serde(default)]
    pub motion: Motion,

    #[serde(default)]
    pub noise: Noise,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in a scenario.toml file.
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Number of video frames to simulate.
    pub frames: usize,
    /// Video frame rate in Hz.
    pub frame_rate: f64,
    /// Attach an integrated IMU reporting once per video frame.
    pub use_imu: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            frames: 600,
            frame_rate: 60.0,
            use_imu: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Camera {
    pub focal_length: f64,
    pub principal_point: [f64; 2],
    pub image_size: [u32; 2],
    /// Radial distortion coefficients `k1, k2, k3`.
    pub distortion: [f64; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            focal_length: 700.0,
            principal_point: [320.0, 240.0],
            image_size: [640, 480],
            distortion: [0.0; 3],
        }
    }
}

impl Camera {
    pub fn to_parameters(&self) -> CameraParameters {
        CameraParameters::new(
            self.focal_length,
            Point2::new(self.principal_point[0], self.principal_point[1]),
            (self.image_size[0], self.image_size[1]),
        )
        .with_distortion(self.distortion)
    }
}

/// The beacon layout generated for the tracked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstellationKind {
    /// Beacons on a circle in the target's XY plane.
    Ring,
    /// Beacons on the corners and face centers of a cube.
    Cube,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Target {
    pub kind: ConstellationKind,
    /// Ring radius or cube half-edge, in meters.
    pub radius: f64,
    /// Number of beacons (ring only; a cube always has 14).
    pub beacons: usize,
    /// One-based ids of beacons whose layout is trusted exactly.
    pub fixed_beacons: Vec<i32>,
    /// Base image-measurement variance of every beacon.
    pub measurement_variance: f64,
    /// Standard deviation (m) of the error injected into the assumed
    /// positions of non-fixed beacons.
    pub calibration_error: f64,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            kind: ConstellationKind::Ring,
            radius: 0.08,
            beacons: 12,
            fixed_beacons: vec![1, 2, 3, 4],
            measurement_variance: 3.0,
            calibration_error: 0.002,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Motion {
    /// Center of the orbit in the camera frame.
    pub center: [f64; 3],
    pub orbit_radius: f64,
    /// Orbit angular rate in rad/s.
    pub orbit_rate: f64,
    /// Peak yaw (about the camera's vertical axis) in radians.
    pub spin_amplitude: f64,
    /// Yaw oscillation rate in rad/s.
    pub spin_rate: f64,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 0.8],
            orbit_radius: 0.1,
            orbit_rate: 0.5,
            spin_amplitude: 0.4,
            spin_rate: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Noise {
    /// Pixel noise standard deviation.
    pub pixel_stddev: f64,
    pub drop_probability: f64,
    /// Probability that a visible beacon is reported under a wrong id.
    pub misidentification_probability: f64,
    pub bright_probability: f64,
    /// Blob area range in pixels, `[min, max]`.
    pub area_range: [f64; 2],
    /// IMU orientation noise (rad, per axis).
    pub imu_orientation_stddev: f64,
    /// Gyroscope noise (rad/s, per axis).
    pub imu_gyro_stddev: f64,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            pixel_stddev: 0.3,
            drop_probability: 0.05,
            misidentification_probability: 0.0,
            bright_probability: 0.1,
            area_range: [3.0, 12.0],
            imu_orientation_stddev: 0.005,
            imu_gyro_stddev: 0.01,
        }
    }
}
