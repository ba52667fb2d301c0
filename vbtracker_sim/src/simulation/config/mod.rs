// vbtracker_sim/src/simulation/config/mod.rs

//! This module handles loading and validating scenario configuration from
//! disk, with environment-variable overrides.

pub mod structs;

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tracing::info;

use crate::simulation::core::error::SimError;
pub use structs::{ConstellationKind, ScenarioConfig};

/// Prefix of environment overrides, e.g. `VBTRACKER_NOISE__PIXEL_STDDEV=0.5`.
pub const ENV_PREFIX: &str = "VBTRACKER_";

impl ScenarioConfig {
    /// Loads a scenario file, lets `VBTRACKER_*` variables override it, and
    /// validates the result.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        if !path.exists() {
            return Err(SimError::MissingScenario(path.to_path_buf()));
        }
        info!("Loading scenario from: {}", path.display());
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Extracts and validates a scenario from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self, SimError> {
        let config: ScenarioConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.tracker.validate()?;

        let positive = [
            ("simulation.frame_rate", self.simulation.frame_rate),
            ("camera.focal_length", self.camera.focal_length),
            ("target.radius", self.target.radius),
            ("target.measurement_variance", self.target.measurement_variance),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(invalid(field, format!("must be positive, got {value}")));
            }
        }

        let probabilities = [
            ("noise.drop_probability", self.noise.drop_probability),
            (
                "noise.misidentification_probability",
                self.noise.misidentification_probability,
            ),
            ("noise.bright_probability", self.noise.bright_probability),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("must lie in [0, 1], got {value}")));
            }
        }

        let non_negative = [
            ("target.calibration_error", self.target.calibration_error),
            ("noise.pixel_stddev", self.noise.pixel_stddev),
            ("noise.imu_orientation_stddev", self.noise.imu_orientation_stddev),
            ("noise.imu_gyro_stddev", self.noise.imu_gyro_stddev),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(invalid(field, format!("must not be negative, got {value}")));
            }
        }

        let [min_area, max_area] = self.noise.area_range;
        if !(min_area > 0.0 && min_area <= max_area) {
            return Err(invalid(
                "noise.area_range",
                format!("expected 0 < min <= max, got [{min_area}, {max_area}]"),
            ));
        }
        if self.target.kind == ConstellationKind::Ring && self.target.beacons < 3 {
            return Err(invalid("target.beacons", "a ring needs at least 3 beacons".into()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> SimError {
    SimError::Invalid { field, reason }
}
