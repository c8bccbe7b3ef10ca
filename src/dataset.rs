use std::io::Read;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};

use crate::error::{HeatmapError, Result};
use crate::models::{Condition, LandmarkRecord, PixelPoint};

pub const IMAGE_SUBDIR: &str = "image";
pub const LABEL_SUBDIR: &str = "label";

/// Annotation files come in a few naming conventions; tried in this order.
pub const MASK_SUFFIXES: [&str; 3] = [".tif", ".png", "_AV.tif"];

/// Parse a landmark table. The first row is a header and is ignored.
///
/// Columns: image reference, nerve x, nerve y, macula x, macula y.
pub fn parse_landmarks<R: Read>(reader: R) -> Result<Vec<LandmarkRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let bad = |message: String| HeatmapError::Landmarks { line, message };

        if row.len() < 5 {
            return Err(bad(format!("expected 5 columns, found {}", row.len())));
        }
        let mut coords = [0i64; 4];
        for (slot, field) in coords.iter_mut().zip(row.iter().skip(1)) {
            *slot = field
                .parse()
                .map_err(|_| bad(format!("'{field}' is not an integer coordinate")))?;
        }

        records.push(LandmarkRecord::new(
            &row[0],
            PixelPoint::new(coords[0], coords[1]),
            PixelPoint::new(coords[2], coords[3]),
        ));
    }
    Ok(records)
}

pub fn load_landmarks<P: AsRef<Path>>(path: P) -> Result<Vec<LandmarkRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(HeatmapError::MissingFile(path.to_path_buf()));
    }
    parse_landmarks(std::fs::File::open(path)?)
}

/// Supplies the annotation mask of one condition for one record
pub trait MaskSource: Sync {
    /// Confirm the record's source photograph is usable at all.
    fn check_record(&self, _record: &LandmarkRecord) -> Result<()> {
        Ok(())
    }

    fn load_mask(&self, record: &LandmarkRecord, condition: &Condition) -> Result<DynamicImage>;
}

/// Dataset laid out as `<root>/image/<ref>` plus `<root>/label/<code>/<stem><suffix>`
#[derive(Debug, Clone)]
pub struct FsMaskSource {
    root: PathBuf,
}

impl FsMaskSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn image_path(&self, record: &LandmarkRecord) -> PathBuf {
        self.root.join(IMAGE_SUBDIR).join(&record.image_ref)
    }

    /// First existing mask file among the suffix variants
    pub fn resolve_mask(&self, record: &LandmarkRecord, condition: &Condition) -> Result<PathBuf> {
        let file_name = Path::new(&record.image_ref)
            .file_name()
            .unwrap_or_default();
        let stem = Path::new(file_name)
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        let dir = self.root.join(LABEL_SUBDIR).join(&condition.code);

        MASK_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{stem}{suffix}")))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| HeatmapError::UnresolvedMaskFile {
                condition: condition.code.clone(),
                image: record.image_ref.clone(),
            })
    }
}

impl MaskSource for FsMaskSource {
    fn check_record(&self, record: &LandmarkRecord) -> Result<()> {
        let path = self.image_path(record);
        if path.exists() {
            Ok(())
        } else {
            Err(HeatmapError::MissingFile(path))
        }
    }

    fn load_mask(&self, record: &LandmarkRecord, condition: &Condition) -> Result<DynamicImage> {
        let path = self.resolve_mask(record, condition)?;
        Ok(ImageReader::open(&path)?.with_guessed_format()?.decode()?)
    }
}
