pub mod alignment;
pub mod canvas;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod postprocess;

pub use alignment::AlignmentTransform;
pub use canvas::{Accumulator, Placement};
pub use config::{CanonicalFrame, HeatmapConfig, TrimMargins, TrimWindow};
pub use dataset::{FsMaskSource, MaskSource};
pub use error::HeatmapError;
pub use models::{Category, CategorySet, Condition, Eye, LandmarkRecord, PixelPoint, Side};
pub use pipeline::{HeatmapPipeline, HeatmapRun, RunSummary, SkipEvent};
pub use postprocess::export::{ExportReport, Exporter};
