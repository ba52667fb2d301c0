// vbtracker_sim/src/simulation/core/error.rs

use std::path::PathBuf;

use thiserror::Error;
use vbtracker_core::error::{BodyError, ConfigError, TargetError};

/// Everything that can stop a scenario from being loaded or set up.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("scenario file not found: {0}")]
    MissingScenario(PathBuf),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] figment::Error),

    #[error("invalid scenario value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid tracker parameters: {0}")]
    Tracker(#[from] ConfigError),

    #[error("invalid target layout: {0}")]
    Target(#[from] TargetError),

    #[error("failed to set up tracked body: {0}")]
    Body(#[from] BodyError),
}
