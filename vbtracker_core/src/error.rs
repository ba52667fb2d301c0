// vbtracker_core/src/error.rs

use thiserror::Error;

/// Errors raised while building or recalibrating a target's beacon tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TargetError {
    #[error("a target needs at least one beacon")]
    NoBeacons,

    /// One of the parallel per-beacon tables disagrees with the position table.
    #[error("beacon table `{table}` has {found} entries, expected {expected}")]
    LengthMismatch {
        table: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("beacon {index} has an invalid measurement variance {variance}")]
    InvalidVariance { index: usize, variance: f64 },

    #[error("beacon {index} has a zero-length emission direction")]
    DegenerateEmissionDirection { index: usize },
}

/// Errors raised by `ConfigParams::validate`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{name}` must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("`max_z_component` must lie in [-1, 0), got {0}")]
    ObliquenessOutOfRange(f64),

    #[error("`{name}` must lie in (0, 1], got {value}")]
    DecayOutOfRange { name: &'static str, value: f64 },
}

/// Errors raised while attaching sensors to a tracked body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BodyError {
    #[error("body already has a video target")]
    TargetAlreadyAttached,

    #[error("body already has an integrated IMU")]
    ImuAlreadyAttached,

    #[error(transparent)]
    Target(#[from] TargetError),
}
