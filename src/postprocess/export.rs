use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::GrayImage;
use ndarray::ArrayView2;
use tracing::{debug, info, warn};

use super::{category_strip, trimmed_counts, vstack};
use crate::canvas::Accumulator;
use crate::config::CanonicalFrame;
use crate::models::Side;

pub const INTERMEDIATE_DIR: &str = "int_data";
pub const README_NAME: &str = "README_csv.txt";

/// Artifacts written by one export, and the ones that could not be
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
}

impl ExportReport {
    fn record(&mut self, path: PathBuf, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                debug!("wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                warn!("failed to write {}: {:#}", path.display(), e);
                self.failures.push((path, format!("{e:#}")));
            }
        }
    }

    pub fn merge(&mut self, other: ExportReport) {
        self.written.extend(other.written);
        self.failures.extend(other.failures);
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write a count grid as comma separated integers, row 0 first
pub fn write_count_csv(path: &Path, grid: ArrayView2<'_, u32>) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in grid.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn save_png(path: &Path, image: &GrayImage) -> Result<()> {
    image
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save image: {}", e))
}

/// Writes every artifact of a finished run into one directory
pub struct Exporter<'a> {
    frame: &'a CanonicalFrame,
    out_dir: PathBuf,
    suffix: String,
}

impl<'a> Exporter<'a> {
    /// `suffix` is appended to every file stem (pass "" for none).
    /// Fails if the output directory cannot be created.
    pub fn new(
        frame: &'a CanonicalFrame,
        out_dir: impl Into<PathBuf>,
        suffix: &str,
    ) -> Result<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Cannot create output directory {}", out_dir.display()))?;
        let suffix = if suffix.is_empty() {
            String::new()
        } else {
            format!("_{suffix}")
        };
        Ok(Self {
            frame,
            out_dir,
            suffix,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn count_csv_path(&self, side: Side, code: &str) -> PathBuf {
        self.out_dir.join(format!(
            "lesion_count_{}_{}{}.csv",
            side.file_label(),
            code,
            self.suffix
        ))
    }

    pub fn heatmap_path(&self, code: &str) -> PathBuf {
        self.out_dir.join(format!("heatmap_{}{}.png", code, self.suffix))
    }

    pub fn stack_path(&self) -> PathBuf {
        self.out_dir.join(format!("heatmap{}.png", self.suffix))
    }

    /// Trimmed raw counts, one CSV per (side, category)
    pub fn write_counts(&self, accumulator: &Accumulator) -> ExportReport {
        let mut report = ExportReport::default();
        let categories = accumulator.categories();
        for side in Side::ALL {
            for category in categories.categories() {
                let condition = categories.condition(category);
                info!("Generating {} {} CSV file", side.display_name(), condition.name);
                let path = self.count_csv_path(side, &condition.code);
                let grid = trimmed_counts(accumulator, self.frame, side, category);
                let outcome = write_count_csv(&path, grid.view());
                report.record(path, outcome);
            }
        }
        report
    }

    /// One right|left|composite strip per category, optionally all stacked
    pub fn write_heatmaps(&self, accumulator: &Accumulator, big_stack: bool) -> ExportReport {
        let mut report = ExportReport::default();
        let categories = accumulator.categories();
        let mut strips = Vec::new();

        for category in categories.categories() {
            let condition = categories.condition(category);
            info!("Generating {} heatmap", condition.name);
            let strip = category_strip(accumulator, self.frame, category);
            let path = self.heatmap_path(&condition.code);
            let outcome = save_png(&path, &strip);
            report.record(path, outcome);
            if big_stack {
                strips.push(strip);
            }
        }

        if big_stack {
            let path = self.stack_path();
            let outcome = save_png(&path, &vstack(&strips));
            report.record(path, outcome);
        }
        report
    }

    /// Explain where the landmarks sit in the CSV frame
    pub fn write_readme(&self) -> ExportReport {
        let mut report = ExportReport::default();
        let path = self.out_dir.join(README_NAME);
        let outcome = std::fs::write(&path, readme_text(self.frame))
            .with_context(|| format!("Failed to write {}", path.display()));
        report.record(path, outcome);
        report
    }

    pub fn write_all(&self, accumulator: &Accumulator, big_stack: bool) -> ExportReport {
        let mut report = self.write_counts(accumulator);
        report.merge(self.write_readme());
        report.merge(self.write_heatmaps(accumulator, big_stack));
        report
    }

    /// Composite counts after `frame_number` records, for animations
    pub fn write_snapshot(&self, accumulator: &Accumulator, frame_number: usize) -> ExportReport {
        let mut report = ExportReport::default();
        let dir = self.out_dir.join(INTERMEDIATE_DIR);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            report.record(dir, Err(e.into()));
            return report;
        }

        let categories = accumulator.categories();
        for category in categories.categories() {
            let code = &categories.condition(category).code;
            let path = dir.join(format!(
                "lesion_count_{}_{}{}_{:04}.csv",
                Side::Composite.file_label(),
                code,
                self.suffix,
                frame_number
            ));
            let grid = trimmed_counts(accumulator, self.frame, Side::Composite, category);
            let outcome = write_count_csv(&path, grid.view());
            report.record(path, outcome);
        }
        report
    }
}

pub fn readme_text(frame: &CanonicalFrame) -> String {
    let (right_nerve, right_macula) = frame.output_landmarks(Side::Right);
    let (left_nerve, left_macula) = frame.output_landmarks(Side::Left);

    let mut text = String::new();
    let _ = writeln!(text, "How to interpret the CSV files");
    let _ = writeln!(text, "==============================");
    let _ = writeln!(text);
    let _ = writeln!(
        text,
        "Each file contains the number of lesions found at each pixel co-ordinate."
    );
    let _ = writeln!(
        text,
        "Note that this uses the screen standard of (0, 0) located at the top left corner."
    );
    let _ = writeln!(text);
    let _ = writeln!(text, "For the right eye and composite images:");
    let _ = writeln!(text, "  Optic nerve position = {right_nerve}");
    let _ = writeln!(text, "  Macular position = {right_macula}");
    let _ = writeln!(text);
    let _ = writeln!(text, "For the left eye:");
    let _ = writeln!(text, "  Optic nerve position = {left_nerve}");
    let _ = writeln!(text, "  Macular position = {left_macula}");
    text
}
