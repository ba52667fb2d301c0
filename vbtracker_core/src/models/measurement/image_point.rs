// vbtracker_core/src/models/measurement/image_point.rs

use nalgebra::{DMatrix, DVector, Isometry3, Matrix2x3, Point2, Point3};

use super::Measurement;
use crate::camera::CameraParameters;
use crate::state::layout::{AUGMENTED_BEACON, AUGMENTED_STATE_DIM, INCREMENTAL_ROTATION, POSITION};
use crate::state::AugmentedState;

/// Predicted points closer to the camera plane than this are rejected.
const MIN_DEPTH: f64 = 1e-6;

/// A measurement model for the image location of one beacon.
///
/// The beacon position (target frame) is carried through the target-to-body
/// transform and the body pose into the camera frame, then projected with the
/// undistorted pinhole camera.
#[derive(Debug, Clone)]
pub struct ImagePointMeasurement<'a> {
    camera: &'a CameraParameters,
    target_to_body: &'a Isometry3<f64>,
    measurement: Point2<f64>,
    variance: f64,
}

impl<'a> ImagePointMeasurement<'a> {
    /// `camera` must already be the undistorted variant.
    pub fn new(
        camera: &'a CameraParameters,
        target_to_body: &'a Isometry3<f64>,
        measurement: Point2<f64>,
    ) -> Self {
        debug_assert!(
            !camera.is_distorted(),
            "image point measurements expect undistorted camera parameters"
        );
        Self {
            camera,
            target_to_body,
            measurement,
            variance: 1.0,
        }
    }

    pub fn measurement(&self) -> &Point2<f64> {
        &self.measurement
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Sets the isotropic pixel variance used as `R`.
    pub fn set_variance(&mut self, variance: f64) {
        self.variance = variance;
    }

    /// The beacon position in the camera frame.
    pub fn camera_point(&self, state: &AugmentedState) -> Point3<f64> {
        let in_body = self.target_to_body * state.beacon().position();
        state.body().pose() * in_body
    }

    /// `h(x)`: where the current state says the beacon should appear.
    pub fn predict(&self, state: &AugmentedState) -> Option<Point2<f64>> {
        self.camera.project(&self.camera_point(state))
    }
}

impl<'s> Measurement<AugmentedState<'s>> for ImagePointMeasurement<'_> {
    fn dimension(&self) -> usize {
        2
    }

    fn residual(&self, state: &AugmentedState<'s>) -> Option<DVector<f64>> {
        let predicted = self.predict(state)?;
        let r = self.measurement - predicted;
        Some(DVector::from_column_slice(r.as_slice()))
    }

    fn jacobian(&self, state: &AugmentedState<'s>) -> Option<DMatrix<f64>> {
        let p = self.camera_point(state);
        if p.z < MIN_DEPTH {
            return None;
        }
        let f = self.camera.focal_length;
        let inv_z = 1.0 / p.z;

        // Derivative of the pinhole projection w.r.t. the camera-frame point.
        #[rustfmt::skip]
        let j_proj = Matrix2x3::new(
            f * inv_z, 0.0,       -f * p.x * inv_z * inv_z,
            0.0,       f * inv_z, -f * p.y * inv_z * inv_z,
        );

        let rotation = state.body().combined_orientation();
        // Beacon offset from the body origin, in the camera frame.
        let lever = p.coords - state.body().position();
        let j_rotation = -(j_proj * lever.cross_matrix());
        let beacon_to_camera = (rotation * self.target_to_body.rotation).to_rotation_matrix();
        let j_beacon = j_proj * beacon_to_camera.matrix();

        let mut h = DMatrix::zeros(2, AUGMENTED_STATE_DIM);
        h.fixed_view_mut::<2, 3>(0, POSITION).copy_from(&j_proj);
        h.fixed_view_mut::<2, 3>(0, INCREMENTAL_ROTATION)
            .copy_from(&j_rotation);
        h.fixed_view_mut::<2, 3>(0, AUGMENTED_BEACON)
            .copy_from(&j_beacon);
        Some(h)
    }

    fn covariance(&self, _state: &AugmentedState<'s>) -> DMatrix<f64> {
        DMatrix::identity(2, 2) * self.variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BeaconState, BodyState, ErrorState};
    use approx::assert_abs_diff_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn camera() -> CameraParameters {
        CameraParameters::new(600.0, Point2::new(320.0, 240.0), (640, 480))
    }

    fn body() -> BodyState {
        let pose = Isometry3::from_parts(
            Translation3::new(0.05, -0.02, 0.8),
            UnitQuaternion::from_euler_angles(0.1, -0.3, 0.2),
        );
        BodyState::new(&pose, 1e-2)
    }

    #[test]
    fn zero_residual_at_predicted_location() {
        let cam = camera();
        let tb = Isometry3::identity();
        let mut body = body();
        let mut beacon = BeaconState::new(&Point3::new(0.03, 0.01, -0.02), 1e-6);
        let aug = AugmentedState::new(&mut body, &mut beacon);
        let probe = ImagePointMeasurement::new(&cam, &tb, Point2::origin());
        let predicted = probe.predict(&aug).unwrap();
        let meas = ImagePointMeasurement::new(&cam, &tb, predicted);
        let r = meas.residual(&aug).unwrap();
        assert_abs_diff_eq!(r.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn analytic_jacobian_matches_finite_differences() {
        let cam = camera();
        let tb = Isometry3::new(Vector3::new(0.0, 0.01, 0.0), Vector3::new(0.0, 0.0, 0.2));
        let base_body = body();
        let base_beacon = BeaconState::new(&Point3::new(0.04, -0.03, 0.01), 1e-6);
        let meas = ImagePointMeasurement::new(&cam, &tb, Point2::origin());

        let (h, z_base, cov) = {
            let mut b = base_body.clone();
            let mut l = base_beacon.clone();
            let aug = AugmentedState::new(&mut b, &mut l);
            (
                meas.jacobian(&aug).unwrap(),
                meas.predict(&aug).unwrap(),
                aug.error_covariance(),
            )
        };

        let epsilon = 1e-7;
        for j in 0..AUGMENTED_STATE_DIM {
            let mut b = base_body.clone();
            let mut l = base_beacon.clone();
            let mut aug = AugmentedState::new(&mut b, &mut l);
            let mut delta = DVector::zeros(AUGMENTED_STATE_DIM);
            delta[j] = epsilon;
            aug.apply_correction(&delta, &cov);
            let z = meas.predict(&aug).unwrap();
            let column = (z - z_base) / epsilon;
            assert_abs_diff_eq!(h[(0, j)], column.x, epsilon = 1e-3);
            assert_abs_diff_eq!(h[(1, j)], column.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn beacon_behind_camera_has_no_residual() {
        let cam = camera();
        let tb = Isometry3::identity();
        let mut body = BodyState::new(&Isometry3::translation(0.0, 0.0, -1.0), 1.0);
        let mut beacon = BeaconState::new(&Point3::origin(), 0.0);
        let aug = AugmentedState::new(&mut body, &mut beacon);
        let meas = ImagePointMeasurement::new(&cam, &tb, Point2::new(320.0, 240.0));
        assert!(meas.residual(&aug).is_none());
        assert!(meas.jacobian(&aug).is_none());
    }
}
