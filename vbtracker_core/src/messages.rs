// vbtracker_core/src/messages.rs

use std::collections::BTreeMap;

use nalgebra::{Isometry3, Matrix6, Point2, UnitQuaternion, Vector2, Vector3};

use crate::camera::CameraParameters;
use crate::estimation::health::TrackingHealth;
use crate::types::{BodyId, OneBasedBeaconId, ToOneBased, ZeroBasedBeaconId};

// =========================================================================
// == Per-frame video input ==
// =========================================================================

/// Axis-aligned extent of a detected blob, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }
}

/// One detected, undistorted and identified blob in a video frame.
///
/// The `used`/`misidentified` flags are written by the estimator during a
/// single correction pass and read back by the caller afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LedMeasurement {
    /// Undistorted image location in pixels.
    pub location: Point2<f64>,
    /// Blob area in pixels.
    pub area: f64,
    /// Whether the blob was classified as bright (likely saturated).
    pub bright: bool,
    /// Blob extent, when the detector reported one.
    pub bounding_box: Option<BoundingBox>,
    /// Identity assigned upstream, possibly unidentified.
    pub id: ZeroBasedBeaconId,
    /// How recently this beacon was re-identified after an ambiguity. Zero
    /// means a well-established identification.
    pub novelty: u8,
    used: bool,
    misidentified: bool,
}

impl LedMeasurement {
    pub fn new(location: Point2<f64>, area: f64, id: ZeroBasedBeaconId) -> Self {
        Self {
            location,
            area,
            bright: false,
            bounding_box: None,
            id,
            novelty: 0,
            used: false,
            misidentified: false,
        }
    }

    pub fn with_bright(mut self, bright: bool) -> Self {
        self.bright = bright;
        self
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    pub fn with_novelty(mut self, novelty: u8) -> Self {
        self.novelty = novelty;
        self
    }

    pub fn one_based_id(&self) -> OneBasedBeaconId {
        self.id.to_one_based()
    }

    pub fn is_identified(&self) -> bool {
        self.id.is_identified()
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_misidentified(&self) -> bool {
        self.misidentified
    }

    pub fn mark_used(&mut self) {
        self.used = true;
    }

    pub fn mark_misidentified(&mut self) {
        self.misidentified = true;
    }
}

/// Diagnostic snapshot of the last frame's handling of one beacon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeaconDebugData {
    pub seen: bool,
    pub measurement: Point2<f64>,
    pub residual: Vector2<f64>,
    pub variance: f64,
}

impl Default for BeaconDebugData {
    fn default() -> Self {
        Self {
            seen: false,
            measurement: Point2::origin(),
            residual: Vector2::zeros(),
            variance: 0.0,
        }
    }
}

impl BeaconDebugData {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything the image-processing stage hands over for one frame.
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// Capture time in seconds.
    pub timestamp: f64,
    /// Camera the blob locations were undistorted against.
    pub camera: CameraParameters,
    /// Identified blobs, already associated with the body whose target they
    /// belong to.
    pub measurements: BTreeMap<BodyId, Vec<LedMeasurement>>,
}

// =========================================================================
// == Inertial input ==
// =========================================================================

/// A report from a fully-integrated IMU/AHRS.
#[derive(Debug, Clone, PartialEq)]
pub enum ImuReport {
    Orientation {
        timestamp: f64,
        orientation: UnitQuaternion<f64>,
    },
    AngularVelocity {
        timestamp: f64,
        /// Angular velocity expressed in the tracking (camera) frame.
        angular_velocity: Vector3<f64>,
    },
}

impl ImuReport {
    pub fn timestamp(&self) -> f64 {
        match self {
            ImuReport::Orientation { timestamp, .. } => *timestamp,
            ImuReport::AngularVelocity { timestamp, .. } => *timestamp,
        }
    }
}

// =========================================================================
// == Outputs ==
// =========================================================================

/// Outcome of one frame for one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrameReport {
    pub body: BodyId,
    /// At least one beacon correction was applied this frame.
    pub got_measurement: bool,
    pub health: TrackingHealth,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub timestamp: f64,
    pub bodies: Vec<BodyFrameReport>,
}

/// The estimated pose of a body, as consumed downstream.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyPoseReport {
    pub timestamp: f64,
    pub pose: Isometry3<f64>,
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// Position then incremental-rotation covariance.
    pub pose_covariance: Matrix6<f64>,
}

impl Default for BodyPoseReport {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            pose: Isometry3::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            pose_covariance: Matrix6::zeros(),
        }
    }
}
