use std::collections::{HashMap, HashSet};

use fundusmap::{
    CanonicalFrame, Condition, HeatmapConfig, HeatmapError, LandmarkRecord, MaskSource,
    PixelPoint, TrimMargins,
};
use image::{DynamicImage, GrayImage, Luma};

/// Masks held in memory, keyed by (image reference, condition code).
#[derive(Default)]
pub struct InMemoryMasks {
    masks: HashMap<(String, String), GrayImage>,
    missing_images: HashSet<String>,
}

impl InMemoryMasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_ref: &str, code: &str, mask: GrayImage) {
        self.masks
            .insert((image_ref.to_string(), code.to_string()), mask);
    }

    /// Pretend the photograph behind `image_ref` is absent.
    pub fn mark_missing(&mut self, image_ref: &str) {
        self.missing_images.insert(image_ref.to_string());
    }
}

impl MaskSource for InMemoryMasks {
    fn check_record(&self, record: &LandmarkRecord) -> Result<(), HeatmapError> {
        if self.missing_images.contains(&record.image_ref) {
            return Err(HeatmapError::MissingFile(record.image_ref.clone().into()));
        }
        Ok(())
    }

    fn load_mask(
        &self,
        record: &LandmarkRecord,
        condition: &Condition,
    ) -> Result<DynamicImage, HeatmapError> {
        self.masks
            .get(&(record.image_ref.clone(), condition.code.clone()))
            .map(|mask| DynamicImage::ImageLuma8(mask.clone()))
            .ok_or_else(|| HeatmapError::UnresolvedMaskFile {
                condition: condition.code.clone(),
                image: record.image_ref.clone(),
            })
    }
}

/// Canonical distance 40, no tilt, 1000px canvas with the nerve at (500, 500).
/// Records with a 40px nerve-macula distance are neither scaled nor rotated.
pub fn unit_config() -> HeatmapConfig {
    HeatmapConfig {
        nerve_macula_distance: 40,
        macula_drop_ratio: 0.0,
        nerve_coord: 500,
        trim: TrimMargins {
            superior: 100,
            nasal: 150,
            inferior: 100,
            temporal: 50,
        },
        nerve_ring_radii: vec![9, 6, 3],
        macula_ring_radius: 5,
        quadrant_box: 40,
        ..HeatmapConfig::default()
    }
}

pub fn unit_frame() -> CanonicalFrame {
    CanonicalFrame::new(&unit_config()).expect("valid test config")
}

/// Same canvas as [`unit_frame`] but with the default 10% macula drop, so records
/// are rotated.
pub fn tilted_frame() -> CanonicalFrame {
    let config = HeatmapConfig {
        macula_drop_ratio: 0.1,
        ..unit_config()
    };
    CanonicalFrame::new(&config).expect("valid test config")
}

pub fn record(image_ref: &str, nerve: (i64, i64), macula: (i64, i64)) -> LandmarkRecord {
    LandmarkRecord::new(
        image_ref,
        PixelPoint::new(nerve.0, nerve.1),
        PixelPoint::new(macula.0, macula.1),
    )
}

/// Blank mask with the listed pixels set to 1
pub fn mask_with(width: u32, height: u32, pixels: &[(u32, u32)]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for (x, y) in pixels {
        mask.put_pixel(*x, *y, Luma([1]));
    }
    mask
}

pub fn filled_mask(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([1]))
}

/// Deterministic blob pattern seeded by `seed`
pub fn patterned_mask(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let v = (x / 7 + y / 5 + seed) % 4;
        Luma([if v == 0 { 255 } else { 0 }])
    })
}
