//! Integration tests for the on-disk dataset layout.
//!
//! Tests cover:
//! - Mask file suffix fallback (.tif, .png, _AV.tif)
//! - Missing photographs and unresolved masks
//! - A full run from a landmark CSV on disk

mod common;

use std::path::Path;

use common::*;
use fundusmap::dataset::{load_landmarks, FsMaskSource};
use fundusmap::{Condition, HeatmapError, MaskSource};
use image::{GrayImage, ImageFormat};

fn touch_image(root: &Path, name: &str) -> anyhow::Result<()> {
    let dir = root.join("image");
    std::fs::create_dir_all(&dir)?;
    GrayImage::new(4, 4).save_with_format(dir.join(name), ImageFormat::Png)?;
    Ok(())
}

fn write_label(root: &Path, code: &str, file: &str, mask: &GrayImage) -> anyhow::Result<()> {
    let dir = root.join("label").join(code);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(file);
    let format = ImageFormat::from_path(&path)?;
    mask.save_with_format(path, format)?;
    Ok(())
}

#[test]
fn mask_suffixes_are_tried_in_order() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let root = dir.path();
    touch_image(root, "eye01.jpg")?;
    let mask = mask_with(8, 8, &[(2, 2)]);
    write_label(root, "A", "eye01.png", &mask)?;
    write_label(root, "A", "eye01.tif", &mask)?;
    write_label(root, "V", "eye01_AV.tif", &mask)?;

    let source = FsMaskSource::new(root);
    let rec = record("eye01.jpg", (6, 2), (2, 2));
    let a = Condition::new("A", "Arterioles");
    let v = Condition::new("V", "Venules");

    assert!(source.resolve_mask(&rec, &a)?.ends_with("A/eye01.tif"));
    assert!(source.resolve_mask(&rec, &v)?.ends_with("V/eye01_AV.tif"));

    let loaded = source.load_mask(&rec, &v)?.to_luma8();
    assert_eq!(loaded.get_pixel(2, 2)[0], 1);
    Ok(())
}

#[test]
fn absent_files_map_to_skip_errors() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let root = dir.path();
    touch_image(root, "present.jpg")?;

    let source = FsMaskSource::new(root);
    let present = record("present.jpg", (6, 2), (2, 2));
    let absent = record("absent.jpg", (6, 2), (2, 2));

    assert!(source.check_record(&present).is_ok());
    let err = source.check_record(&absent).unwrap_err();
    assert!(matches!(err, HeatmapError::MissingFile(_)));
    assert!(!err.is_fatal());

    let err = source
        .load_mask(&present, &Condition::new("EX", "Exudates"))
        .unwrap_err();
    assert!(matches!(err, HeatmapError::UnresolvedMaskFile { .. }));
    Ok(())
}

#[test]
fn full_run_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let root = dir.path();

    let csv = root.join("coords.csv");
    std::fs::write(
        &csv,
        "image,nerve_x,nerve_y,macula_x,macula_y\n\
         right.jpg,300,100,260,100\n\
         left.jpg,100,100,140,100\n\
         missing.jpg,300,100,260,100\n",
    )?;
    touch_image(root, "right.jpg")?;
    touch_image(root, "left.jpg")?;
    write_label(root, "A", "right.png", &mask_with(400, 200, &[(300, 100)]))?;
    write_label(root, "V", "right.tif", &mask_with(400, 200, &[]))?;
    write_label(root, "A", "left.png", &mask_with(400, 200, &[(100, 100)]))?;

    let records = load_landmarks(&csv)?;
    assert_eq!(records.len(), 3);

    let source = FsMaskSource::new(root);
    let run = HeatmapPipeline::new(unit_frame(), CategorySet::vessels())
        .run_with_executor(&records, &source, 1)?;

    let summary = &run.summary;
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(summary.records_accumulated, 2);
    assert_eq!(summary.contributions_committed, 3);
    // left.jpg has no V annotation
    assert_eq!(summary.contributions_skipped, 1);
    assert_eq!(summary.skipped[0].image, "left.jpg");
    assert_eq!(summary.skipped[1].image, "missing.jpg");

    let a = Category::Condition(0);
    assert_eq!(run.accumulator.grid(Side::Right, a)[[500, 500]], 1);
    assert_eq!(run.accumulator.grid(Side::Left, a)[[500, 500]], 1);
    assert_eq!(run.accumulator.total(Side::Composite, a), 2);
    Ok(())
}

#[test]
fn missing_landmark_file_is_reported() {
    let err = load_landmarks("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, HeatmapError::MissingFile(_)));
}
