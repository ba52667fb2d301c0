// vbtracker_core/src/camera.rs

use nalgebra::{Point2, Point3, Vector2};

/// Points closer than this to the camera plane cannot be projected.
const MIN_PROJECTION_DEPTH: f64 = 1e-6;
const UNDISTORT_ITERATIONS: usize = 10;

/// Pinhole intrinsics plus a three-term radial distortion model.
///
/// The camera frame looks down +Z: a point in front of the camera has a
/// positive z, and a beacon pointed straight at the lens emits along -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraParameters {
    /// Focal length in pixels (square pixels assumed).
    pub focal_length: f64,
    /// Principal point in pixels.
    pub principal_point: Point2<f64>,
    /// Radial distortion coefficients `[k1, k2, k3]`.
    pub distortion: [f64; 3],
    /// Image size in pixels, `(width, height)`.
    pub image_size: (u32, u32),
}

impl CameraParameters {
    pub fn new(focal_length: f64, principal_point: Point2<f64>, image_size: (u32, u32)) -> Self {
        Self {
            focal_length,
            principal_point,
            distortion: [0.0; 3],
            image_size,
        }
    }

    pub fn with_distortion(mut self, distortion: [f64; 3]) -> Self {
        self.distortion = distortion;
        self
    }

    pub fn is_distorted(&self) -> bool {
        self.distortion.iter().any(|k| *k != 0.0)
    }

    /// The same intrinsics with the distortion removed. Measurements handed to
    /// the estimator are expressed against this variant.
    pub fn undistorted(&self) -> Self {
        Self {
            distortion: [0.0; 3],
            ..self.clone()
        }
    }

    /// Projects a camera-frame point with the pinhole model, applying the
    /// radial distortion if this camera has any. `None` when the point is not
    /// in front of the camera.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z < MIN_PROJECTION_DEPTH {
            return None;
        }
        let normalized = Vector2::new(p.x / p.z, p.y / p.z);
        let normalized = normalized * self.radial_factor(normalized.norm_squared());
        Some(self.principal_point + normalized * self.focal_length)
    }

    /// Maps an ideal (undistorted) pixel location to where this camera images it.
    pub fn distort_point(&self, undistorted: &Point2<f64>) -> Point2<f64> {
        let n = (undistorted - self.principal_point) / self.focal_length;
        self.principal_point + n * self.radial_factor(n.norm_squared()) * self.focal_length
    }

    /// Inverse of `distort_point`, solved by fixed-point iteration.
    pub fn undistort_point(&self, distorted: &Point2<f64>) -> Point2<f64> {
        if !self.is_distorted() {
            return *distorted;
        }
        let nd = (distorted - self.principal_point) / self.focal_length;
        let mut nu = nd;
        for _ in 0..UNDISTORT_ITERATIONS {
            nu = nd / self.radial_factor(nu.norm_squared());
        }
        self.principal_point + nu * self.focal_length
    }

    /// Whether a pixel location falls inside the image.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        let (w, h) = self.image_size;
        p.x >= 0.0 && p.y >= 0.0 && p.x < w as f64 && p.y < h as f64
    }

    fn radial_factor(&self, r2: f64) -> f64 {
        let [k1, k2, k3] = self.distortion;
        1.0 + r2 * (k1 + r2 * (k2 + r2 * k3))
    }
}
