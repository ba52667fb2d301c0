// vbtracker_sim/src/simulation/sensors/camera.rs

use nalgebra::{Isometry3, Point2};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::simulation::config::structs::Noise;
use crate::simulation::core::error::SimError;
use crate::simulation::world::Constellation;
use vbtracker_core::camera::CameraParameters;
use vbtracker_core::messages::{BoundingBox, LedMeasurement};
use vbtracker_core::types::ZeroBasedBeaconId;

/// Beacons whose emission is more oblique than this are invisible.
const MIN_VISIBLE_FACING: f64 = 0.1;

/// # Simulated Camera
/// Stands in for the image-processing stage: renders the true beacons into
/// the image, then hands back noisy, undistorted, identified blobs.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    params: CameraParameters,
    ideal: CameraParameters,
    pixel_noise: Normal<f64>,
    area: Uniform<f64>,
    drop_probability: f64,
    misidentification_probability: f64,
    bright_probability: f64,
}

impl SimulatedCamera {
    pub fn new(params: CameraParameters, noise: &Noise) -> Result<Self, SimError> {
        let pixel_noise = Normal::new(0.0, noise.pixel_stddev).map_err(|e| SimError::Invalid {
            field: "noise.pixel_stddev",
            reason: e.to_string(),
        })?;
        let [min_area, max_area] = noise.area_range;
        Ok(Self {
            ideal: params.undistorted(),
            params,
            pixel_noise,
            area: Uniform::new_inclusive(min_area, max_area),
            drop_probability: noise.drop_probability,
            misidentification_probability: noise.misidentification_probability,
            bright_probability: noise.bright_probability,
        })
    }

    pub fn params(&self) -> &CameraParameters {
        &self.params
    }

    /// Observes `constellation` mounted on a body at `body_pose`.
    pub fn observe<R: Rng>(
        &self,
        body_pose: &Isometry3<f64>,
        target_to_body: &Isometry3<f64>,
        constellation: &Constellation,
        rng: &mut R,
    ) -> Vec<LedMeasurement> {
        let target_to_camera = body_pose * target_to_body;
        let mut leds = Vec::new();
        for (index, (position, direction)) in constellation
            .positions
            .iter()
            .zip(&constellation.emission_directions)
            .enumerate()
        {
            if (target_to_camera.rotation * *direction).z > -MIN_VISIBLE_FACING {
                continue;
            }
            let Some(ideal) = self.ideal.project(&(target_to_camera * *position)) else {
                continue;
            };
            if rng.gen_bool(self.drop_probability) {
                continue;
            }

            // Noise lives in the raw (distorted) image; the detector then
            // undistorts the blob center.
            let raw = self.params.distort_point(&ideal);
            let noisy = Point2::new(
                raw.x + self.pixel_noise.sample(rng),
                raw.y + self.pixel_noise.sample(rng),
            );
            if !self.params.contains(&noisy) {
                continue;
            }
            let location = self.params.undistort_point(&noisy);

            let id = if rng.gen_bool(self.misidentification_probability) {
                ZeroBasedBeaconId::from_index(rng.gen_range(0..constellation.len()))
            } else {
                ZeroBasedBeaconId::from_index(index)
            };
            let area = self.area.sample(rng);
            let side = area.sqrt();
            leds.push(
                LedMeasurement::new(location, area, id)
                    .with_bright(rng.gen_bool(self.bright_probability))
                    .with_bounding_box(BoundingBox::new(side, side * rng.gen_range(0.9..1.1))),
            );
        }
        leds
    }
}
