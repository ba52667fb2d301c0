// vbtracker_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::PoseEstimator;
pub use crate::models::measurement::Measurement;
pub use crate::models::process::ProcessModel;
pub use crate::state::ErrorState;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::camera::CameraParameters;
pub use crate::config::ConfigParams;
pub use crate::error::{BodyError, ConfigError, TargetError};
pub use crate::messages::{
    BeaconDebugData, BodyFrameReport, BodyPoseReport, BoundingBox, FrameInput, FrameReport,
    ImuReport, LedMeasurement,
};
pub use crate::state::{BeaconState, BodyState};
pub use crate::types::{BodyId, OneBasedBeaconId, ToOneBased, ZeroBasedBeaconId};

// --- Estimation and tracking ---
pub use crate::estimation::{ScaatKalmanPoseEstimator, TrackingHealth};
pub use crate::tracking::{
    TargetSetup, TrackedBody, TrackedBodyImu, TrackedBodyTarget, TrackingSystem,
};
