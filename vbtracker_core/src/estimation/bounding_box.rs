// vbtracker_core/src/estimation/bounding_box.rs

use crate::messages::LedMeasurement;

/// Whether a blob's bounding box looks like a single, roughly round LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundingBoxPlausibility {
    Pass,
    Fail,
    /// No usable bounding box was reported.
    Unknown,
}

/// Checks the blob's aspect ratio against the inclusive `(min, max)` band.
pub fn check_bounding_box(led: &LedMeasurement, band: (f64, f64)) -> BoundingBoxPlausibility {
    let Some(bbox) = led.bounding_box else {
        return BoundingBoxPlausibility::Unknown;
    };
    if bbox.width <= 0.0 || bbox.height <= 0.0 {
        return BoundingBoxPlausibility::Unknown;
    }
    let ratio = bbox.aspect_ratio();
    let (min, max) = band;
    if (min..=max).contains(&ratio) {
        BoundingBoxPlausibility::Pass
    } else {
        BoundingBoxPlausibility::Fail
    }
}
