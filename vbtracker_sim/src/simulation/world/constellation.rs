// vbtracker_sim/src/simulation/world/constellation.rs

use nalgebra::{Point3, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;

use crate::simulation::config::structs::{ConstellationKind, Target};
use crate::simulation::core::error::SimError;
use vbtracker_core::tracking::TargetSetup;
use vbtracker_core::types::OneBasedBeaconId;

/// Ground-truth beacon layout of a target, in the target frame.
///
/// At identity orientation the target faces the camera: its beacons emit
/// along -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Constellation {
    pub positions: Vec<Point3<f64>>,
    pub emission_directions: Vec<Vector3<f64>>,
}

impl Constellation {
    pub fn generate(config: &Target) -> Self {
        match config.kind {
            ConstellationKind::Ring => Self::ring(config.beacons, config.radius),
            ConstellationKind::Cube => Self::cube(config.radius),
        }
    }

    /// `count` beacons on a circle, tilted slightly outwards.
    pub fn ring(count: usize, radius: f64) -> Self {
        let (positions, emission_directions) = (0..count)
            .map(|i| {
                let angle = TAU * i as f64 / count as f64;
                let radial = Vector3::new(angle.cos(), angle.sin(), 0.0);
                let position = Point3::from(radial * radius);
                let direction = (radial * 0.3 - Vector3::z()).normalize();
                (position, direction)
            })
            .unzip();
        Self {
            positions,
            emission_directions,
        }
    }

    /// The 8 corners and 6 face centers of a cube with half-edge `half`,
    /// each emitting along its outward normal.
    pub fn cube(half: f64) -> Self {
        let mut positions = Vec::with_capacity(14);
        let mut emission_directions = Vec::with_capacity(14);
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                let mut normal = Vector3::zeros();
                normal[axis] = sign;
                positions.push(Point3::from(normal * half));
                emission_directions.push(normal);
            }
        }
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    let corner = Vector3::new(x, y, z);
                    positions.push(Point3::from(corner * half));
                    emission_directions.push(corner.normalize());
                }
            }
        }
        Self {
            positions,
            emission_directions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The layout the tracker is told about: the true layout with
    /// `calibration_error` noise on every beacon not listed as fixed.
    pub fn assumed_setup<R: Rng>(&self, config: &Target, rng: &mut R) -> Result<TargetSetup, SimError> {
        let fixed = |id: OneBasedBeaconId| {
            id.value()
                .is_some_and(|value| config.fixed_beacons.contains(&value))
        };
        let noise = Normal::new(0.0, config.calibration_error).map_err(|e| SimError::Invalid {
            field: "target.calibration_error",
            reason: e.to_string(),
        })?;
        let setup = TargetSetup::new(
            self.positions.clone(),
            self.emission_directions.clone(),
            config.measurement_variance,
        )
        .mark_fixed_by(fixed);

        let positions = self
            .positions
            .iter()
            .zip(&setup.fixed)
            .map(|(position, &is_fixed)| {
                if is_fixed {
                    *position
                } else {
                    let offset = Vector3::from_fn(|_, _| noise.sample(&mut *rng));
                    *position + offset
                }
            })
            .collect();
        Ok(TargetSetup { positions, ..setup })
    }
}
