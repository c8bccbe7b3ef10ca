use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate};

use super::AlignmentTransform;

/// Collapse any annotation encoding to a 0/1 mask (positive means annotated)
pub fn binarize(img: &DynamicImage) -> GrayImage {
    let luma = img.to_luma16();
    let mut mask = GrayImage::new(luma.width(), luma.height());
    for (out, src) in mask.pixels_mut().zip(luma.pixels()) {
        *out = Luma([u8::from(src[0] > 0)]);
    }
    mask
}

/// Dimensions of a `width` x `height` mask after [`resample`], never below 1px
pub fn scaled_size(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let side = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (side(width), side(height))
}

/// Scale a 0/1 mask by `scale` with nearest-neighbour sampling so it stays binary
pub fn resample(mask: &GrayImage, scale: f64) -> GrayImage {
    let (width, height) = scaled_size(mask.width(), mask.height(), scale);
    if (width, height) == mask.dimensions() {
        return mask.clone();
    }
    imageops::resize(mask, width, height, FilterType::Nearest)
}

/// Rotate counter-clockwise about `pivot`, keeping the input dimensions.
/// Content rotated out of the frame is dropped.
pub fn rotate_about(mask: &GrayImage, pivot: (f32, f32), degrees: f64) -> GrayImage {
    if degrees == 0.0 {
        return mask.clone();
    }
    // imageproc rotates clockwise
    let theta = -(degrees.to_radians() as f32);
    rotate(mask, pivot, theta, Interpolation::Nearest, Luma([0u8]))
}

/// Bring a raw annotation image into the canonical frame
pub fn transform_mask(img: &DynamicImage, transform: &AlignmentTransform) -> GrayImage {
    let binary = binarize(img);
    let scaled = resample(&binary, transform.scale);
    let pivot = (
        transform.translated_nerve.x as f32,
        transform.translated_nerve.y as f32,
    );
    rotate_about(&scaled, pivot, transform.rotation_degrees)
}
