use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Result;
use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::alignment::AlignmentTransform;
use crate::alignment::mask::{scaled_size, transform_mask};
use crate::canvas::{Accumulator, check_fits};
use crate::config::CanonicalFrame;
use crate::dataset::MaskSource;
use crate::error::HeatmapError;
use crate::models::{CategorySet, LandmarkRecord};
use crate::postprocess::export::{ExportReport, Exporter};

/// A contribution that was left out of the canvases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEvent {
    pub record_index: usize,
    pub image: String,
    /// `None` when the whole record was rejected
    pub condition: Option<String>,
    pub reason: String,
}

/// What a run accumulated and what it had to leave out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records_seen: usize,
    pub records_accumulated: usize,
    pub records_skipped: usize,
    pub contributions_committed: usize,
    pub contributions_skipped: usize,
    pub skipped: Vec<SkipEvent>,
}

impl RunSummary {
    fn skip_record(&mut self, index: usize, record: &LandmarkRecord, error: &HeatmapError) {
        warn!("ignoring {}: {}", record.image_ref, error);
        self.records_skipped += 1;
        self.skipped.push(SkipEvent {
            record_index: index,
            image: record.image_ref.clone(),
            condition: None,
            reason: error.to_string(),
        });
    }

    fn skip_contribution(
        &mut self,
        index: usize,
        record: &LandmarkRecord,
        code: &str,
        error: &HeatmapError,
    ) {
        warn!("{} ignored for {}: {}", code, record.image_ref, error);
        self.contributions_skipped += 1;
        self.skipped.push(SkipEvent {
            record_index: index,
            image: record.image_ref.clone(),
            condition: Some(code.to_string()),
            reason: error.to_string(),
        });
    }

    pub fn log(&self) {
        info!(
            "{} of {} records accumulated, {} skipped",
            self.records_accumulated, self.records_seen, self.records_skipped
        );
        info!(
            "{} category masks committed, {} skipped",
            self.contributions_committed, self.contributions_skipped
        );
    }
}

/// Canvases plus bookkeeping of one finished run
#[derive(Debug)]
pub struct HeatmapRun {
    pub accumulator: Accumulator,
    pub summary: RunSummary,
    /// Per-record snapshot files, empty unless snapshots were requested
    pub snapshots: ExportReport,
}

/// Output of the per-record stage: everything except the canvas write
struct PreparedRecord<'r> {
    index: usize,
    record: &'r LandmarkRecord,
    outcome: Result<PreparedMasks, HeatmapError>,
}

struct PreparedMasks {
    transform: AlignmentTransform,
    masks: Vec<Result<GrayImage, HeatmapError>>,
}

/// Where per-record composite snapshots go
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    pub output_dir: PathBuf,
    pub suffix: String,
}

/// Aligns every record's masks and accumulates them.
///
/// Records are independent until the canvas commit, so they can be prepared on a
/// thread pool; commits always happen on the thread that owns the [`Accumulator`].
pub struct HeatmapPipeline {
    frame: CanonicalFrame,
    categories: CategorySet,
    snapshots: Option<SnapshotConfig>,
}

impl HeatmapPipeline {
    pub fn new(frame: CanonicalFrame, categories: CategorySet) -> Self {
        Self {
            frame,
            categories,
            snapshots: None,
        }
    }

    /// Write trimmed composite counts after every record into `<dir>/int_data`
    pub fn with_snapshots(mut self, output_dir: PathBuf, suffix: impl Into<String>) -> Self {
        self.snapshots = Some(SnapshotConfig {
            output_dir,
            suffix: suffix.into(),
        });
        self
    }

    fn prepare<'r>(
        &self,
        index: usize,
        record: &'r LandmarkRecord,
        source: &dyn MaskSource,
    ) -> PreparedRecord<'r> {
        debug!("processing {}", record.image_ref);
        let outcome = source.check_record(record).and_then(|()| {
            let transform = AlignmentTransform::from_record(record, &self.frame)?;
            let masks = self
                .categories
                .conditions()
                .iter()
                .map(|condition| -> Result<GrayImage, HeatmapError> {
                    let raw = source.load_mask(record, condition)?;
                    let (width, height) = scaled_size(raw.width(), raw.height(), transform.scale);
                    check_fits(
                        &self.frame,
                        transform.eye,
                        transform.translated_nerve,
                        width,
                        height,
                    )?;
                    Ok(transform_mask(&raw, &transform))
                })
                .collect();
            Ok(PreparedMasks { transform, masks })
        });

        PreparedRecord {
            index,
            record,
            outcome,
        }
    }

    fn commit(
        &self,
        accumulator: &mut Accumulator,
        summary: &mut RunSummary,
        snapshots: Option<(&Exporter<'_>, &mut ExportReport)>,
        prepared: PreparedRecord<'_>,
    ) {
        let PreparedRecord {
            index,
            record,
            outcome,
        } = prepared;

        let prepared = match outcome {
            Ok(prepared) => prepared,
            Err(e) => {
                summary.skip_record(index, record, &e);
                return;
            }
        };

        let transform = prepared.transform;
        for (condition, mask) in prepared.masks.into_iter().enumerate() {
            let code = &self.categories.conditions()[condition].code;
            let outcome = mask.and_then(|mask| {
                accumulator.commit(transform.eye, condition, &mask, transform.translated_nerve)
            });
            match outcome {
                Ok(()) => summary.contributions_committed += 1,
                Err(e) => summary.skip_contribution(index, record, code, &e),
            }
        }
        summary.records_accumulated += 1;

        if let Some((exporter, report)) = snapshots {
            report.merge(exporter.write_snapshot(accumulator, index));
        }
    }

    fn snapshot_exporter(&self) -> Result<Option<Exporter<'_>>> {
        self.snapshots
            .as_ref()
            .map(|s| Exporter::new(&self.frame, &s.output_dir, &s.suffix))
            .transpose()
    }

    fn finish(
        &self,
        accumulator: Accumulator,
        mut summary: RunSummary,
        snapshots: ExportReport,
    ) -> HeatmapRun {
        summary.skipped.sort_by_key(|event| event.record_index);
        summary.log();
        if !snapshots.is_complete() {
            warn!("{} snapshot files could not be written", snapshots.failures.len());
        }
        HeatmapRun {
            accumulator,
            summary,
            snapshots,
        }
    }

    /// Process records one after another on the calling thread
    pub fn run(&self, records: &[LandmarkRecord], source: &dyn MaskSource) -> Result<HeatmapRun> {
        let snapshots = self.snapshot_exporter()?;
        let mut snapshot_report = ExportReport::default();
        let mut accumulator = Accumulator::new(&self.frame, &self.categories);
        let mut summary = RunSummary {
            records_seen: records.len(),
            ..RunSummary::default()
        };

        info!("Extracting lesion data from {} records", records.len());
        for (index, record) in records.iter().enumerate() {
            let prepared = self.prepare(index, record, source);
            let snapshots = snapshots.as_ref().map(|e| (e, &mut snapshot_report));
            self.commit(&mut accumulator, &mut summary, snapshots, prepared);
        }

        Ok(self.finish(accumulator, summary, snapshot_report))
    }

    /// Prepare records on the rayon pool and commit them through a bounded queue.
    ///
    /// Produces the same canvases as [`HeatmapPipeline::run`]; only the commit order
    /// differs.
    pub fn run_with_executor(
        &self,
        records: &[LandmarkRecord],
        source: &dyn MaskSource,
        queue_depth: usize,
    ) -> Result<HeatmapRun> {
        let snapshots = self.snapshot_exporter()?;
        let mut snapshot_report = ExportReport::default();
        let mut accumulator = Accumulator::new(&self.frame, &self.categories);
        let mut summary = RunSummary {
            records_seen: records.len(),
            ..RunSummary::default()
        };

        info!(
            "Extracting lesion data from {} records on {} threads",
            records.len(),
            rayon::current_num_threads()
        );
        let (sender, receiver) = mpsc::sync_channel::<PreparedRecord<'_>>(queue_depth.max(1));

        std::thread::scope(|scope| {
            scope.spawn(move || {
                records
                    .par_iter()
                    .enumerate()
                    .for_each_with(sender, |sender, (index, record)| {
                        let prepared = self.prepare(index, record, source);
                        // the receiver outlives every producer inside this scope
                        let _ = sender.send(prepared);
                    });
            });

            for prepared in receiver {
                let snapshots = snapshots.as_ref().map(|e| (e, &mut snapshot_report));
                self.commit(&mut accumulator, &mut summary, snapshots, prepared);
            }
        });

        Ok(self.finish(accumulator, summary, snapshot_report))
    }
}
