pub mod mask;

use crate::config::CanonicalFrame;
use crate::error::{HeatmapError, Result};
use crate::models::{Eye, LandmarkRecord, PixelPoint};

/// Scale and rotation that bring one photograph into the canonical frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentTransform {
    pub eye: Eye,
    pub scale: f64,
    /// Counter-clockwise rotation applied to the scaled mask
    pub rotation_degrees: f64,
    /// Nerve position after scaling, before rotation; the rotation pivot
    pub translated_nerve: PixelPoint,
}

impl AlignmentTransform {
    /// Derive the transform for `record`.
    ///
    /// The nerve-macula angle is computed from absolute coordinate deltas, so it always
    /// lies in the first quadrant; the sign of the correction comes from laterality alone.
    pub fn from_record(record: &LandmarkRecord, frame: &CanonicalFrame) -> Result<Self> {
        let dx = (record.nerve.x - record.macula.x).abs() as f64;
        let dy = (record.nerve.y - record.macula.y).abs() as f64;
        let distance = dx.hypot(dy).floor();

        if distance == 0.0 {
            return Err(HeatmapError::DegenerateLandmarks {
                image: record.image_ref.clone(),
            });
        }

        let angle = dy.atan2(dx).to_degrees();
        let eye = record.eye();
        let rotation_degrees = match eye {
            Eye::Right => frame.tilt_degrees - angle,
            Eye::Left => angle - frame.tilt_degrees,
        };

        let scale = frame.nerve_macula_distance as f64 / distance;
        let translated_nerve = PixelPoint::new(
            (record.nerve.x as f64 * scale).round() as i64,
            (record.nerve.y as f64 * scale).round() as i64,
        );

        Ok(Self {
            eye,
            scale,
            rotation_degrees,
            translated_nerve,
        })
    }
}
