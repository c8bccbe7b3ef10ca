use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while aligning and accumulating annotation masks.
///
/// Most variants only disqualify one record or one (record, category) pair; see
/// [`HeatmapError::is_fatal`] for the ones that stop a run.
#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("nerve and macula share a position in {image}")]
    DegenerateLandmarks { image: String },

    #[error(
        "placement {width}x{height} at ({x_from}, {y_from}) falls outside the {canvas_side}px canvas"
    )]
    OutOfBoundsPlacement {
        x_from: i64,
        y_from: i64,
        width: u32,
        height: u32,
        canvas_side: usize,
    },

    #[error("no {condition} mask found for {image}")]
    UnresolvedMaskFile { condition: String, image: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("landmark file line {line}: {message}")]
    Landmarks { line: u64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HeatmapError {
    /// Whether the error must abort the run instead of skipping a contribution.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HeatmapError::InvalidConfig(_) | HeatmapError::Landmarks { .. } | HeatmapError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
