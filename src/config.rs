use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};
use crate::models::{PixelPoint, Side};

/// Pixels cut from each border of the accumulated canvas, in unscaled units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimMargins {
    pub superior: u32,
    pub nasal: u32,
    pub inferior: u32,
    pub temporal: u32,
}

impl Default for TrimMargins {
    fn default() -> Self {
        Self {
            superior: 450,
            nasal: 600,
            inferior: 450,
            temporal: 300,
        }
    }
}

/// User-facing heatmap settings.
///
/// Distances are given for a multiplier of 1.0 (1100x1100 output views) and scaled by
/// `size_multiplier` when the [`CanonicalFrame`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub size_multiplier: f64,
    /// Nerve to macula distance every image is scaled to
    pub nerve_macula_distance: u32,
    /// Vertical macula offset below the nerve, as a fraction of the distance
    pub macula_drop_ratio: f64,
    /// Nerve position on the square accumulation canvas (both axes)
    pub nerve_coord: u32,
    pub trim: TrimMargins,
    pub nerve_ring_radii: Vec<u32>,
    pub macula_ring_radius: u32,
    pub ring_thickness: u32,
    pub draw_quadrants: bool,
    pub quadrant_box: u32,
    pub big_stack_image: bool,
    pub save_intermediate: bool,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            size_multiplier: 1.0,
            nerve_macula_distance: 250,
            macula_drop_ratio: 0.1,
            nerve_coord: 1000,
            trim: TrimMargins::default(),
            nerve_ring_radii: vec![45, 30, 15],
            macula_ring_radius: 25,
            ring_thickness: 2,
            draw_quadrants: false,
            quadrant_box: 200,
            big_stack_image: false,
            save_intermediate: false,
        }
    }
}

impl HeatmapConfig {
    /// Load a JSON config file; missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HeatmapError::MissingFile(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// The derived, validated geometry every component works in.
///
/// Built once per run from a [`HeatmapConfig`]; all values are already scaled by the
/// size multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFrame {
    pub nerve_macula_distance: i64,
    pub macula_drop: i64,
    pub tilt_degrees: f64,
    pub nerve_coord: i64,
    pub canvas_side: usize,
    pub trim: TrimMargins,
    pub nerve_ring_radii: Vec<i32>,
    pub macula_ring_radius: i32,
    pub ring_thickness: i32,
    pub draw_quadrants: bool,
    pub quadrant_box: i32,
}

fn scaled(value: u32, multiplier: f64) -> i64 {
    (value as f64 * multiplier) as i64
}

impl CanonicalFrame {
    pub fn new(config: &HeatmapConfig) -> Result<Self> {
        let m = config.size_multiplier;
        if !m.is_finite() || m <= 0.0 {
            return Err(HeatmapError::InvalidConfig(format!(
                "size multiplier must be positive, got {m}"
            )));
        }
        if !config.macula_drop_ratio.is_finite() || config.macula_drop_ratio < 0.0 {
            return Err(HeatmapError::InvalidConfig(format!(
                "macula drop ratio must be non-negative, got {}",
                config.macula_drop_ratio
            )));
        }

        let distance = scaled(config.nerve_macula_distance, m);
        if distance <= 0 {
            return Err(HeatmapError::InvalidConfig(
                "canonical nerve-macula distance must be positive".into(),
            ));
        }
        let nerve_coord = scaled(config.nerve_coord, m);
        if nerve_coord <= 0 {
            return Err(HeatmapError::InvalidConfig(
                "canonical nerve coordinate must be positive".into(),
            ));
        }

        // saturate so oversized margins fail the check below instead of wrapping
        let margin = |v: u32| u32::try_from(scaled(v, m)).unwrap_or(u32::MAX);
        let trim = TrimMargins {
            superior: margin(config.trim.superior),
            nasal: margin(config.trim.nasal),
            inferior: margin(config.trim.inferior),
            temporal: margin(config.trim.temporal),
        };
        let canvas_side = (nerve_coord * 2) as usize;
        let fits = |a: u32, b: u32| {
            a.checked_add(b)
                .is_some_and(|sum| (sum as usize) < canvas_side)
        };
        if !fits(trim.superior, trim.inferior) || !fits(trim.nasal, trim.temporal) {
            return Err(HeatmapError::InvalidConfig(format!(
                "trim margins leave nothing of the {canvas_side}px canvas"
            )));
        }

        let macula_drop = (distance as f64 * config.macula_drop_ratio) as i64;
        let tilt_degrees = (macula_drop as f64 / distance as f64).atan().to_degrees();

        Ok(Self {
            nerve_macula_distance: distance,
            macula_drop,
            tilt_degrees,
            nerve_coord,
            canvas_side,
            trim,
            nerve_ring_radii: config
                .nerve_ring_radii
                .iter()
                .map(|r| scaled(*r, m) as i32)
                .collect(),
            macula_ring_radius: scaled(config.macula_ring_radius, m) as i32,
            ring_thickness: config.ring_thickness as i32,
            draw_quadrants: config.draw_quadrants,
            quadrant_box: scaled(config.quadrant_box, m) as i32,
        })
    }

    /// Canvas position every nerve is placed on
    pub fn anchor(&self) -> PixelPoint {
        PixelPoint::new(self.nerve_coord, self.nerve_coord)
    }

    /// Canonical macula position on the untrimmed canvas of `side`
    pub fn canvas_macula(&self, side: Side) -> PixelPoint {
        let direction = match side {
            Side::Left => -1,
            Side::Right | Side::Composite => 1,
        };
        PixelPoint::new(
            self.nerve_coord - direction * self.nerve_macula_distance,
            self.nerve_coord + self.macula_drop,
        )
    }

    /// (columns, rows) of a trimmed view
    pub fn trimmed_size(&self) -> (usize, usize) {
        let width = self.canvas_side - (self.trim.nasal + self.trim.temporal) as usize;
        let height = self.canvas_side - (self.trim.superior + self.trim.inferior) as usize;
        (width, height)
    }

    /// Left canvases keep the mirrored nasal/temporal margins.
    pub fn trim_window(&self, side: Side) -> TrimWindow {
        let left = match side {
            Side::Left => self.trim.nasal,
            Side::Right | Side::Composite => self.trim.temporal,
        } as usize;
        let (width, height) = self.trimmed_size();
        TrimWindow {
            left,
            top: self.trim.superior as usize,
            width,
            height,
        }
    }

    /// Nerve and macula positions in the trimmed output frame of `side`
    pub fn output_landmarks(&self, side: Side) -> (PixelPoint, PixelPoint) {
        let window = self.trim_window(side);
        let shift = |p: PixelPoint| {
            PixelPoint::new(p.x - window.left as i64, p.y - window.top as i64)
        };
        (shift(self.anchor()), shift(self.canvas_macula(side)))
    }
}

/// Crop rectangle applied to a full canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}
