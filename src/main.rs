use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fundusmap::{
    CanonicalFrame, CategorySet, Exporter, FsMaskSource, HeatmapConfig, HeatmapPipeline,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DataType {
    /// Diabetic retinopathy lesions
    Dr,
    /// Arterioles and venules
    Vessels,
}

#[derive(Parser)]
#[command(name = "fundusmap")]
#[command(about = "Build population heatmaps of retinal annotations aligned on nerve and macula")]
struct Cli {
    /// Landmark table: image, nerve_x, nerve_y, macula_x, macula_y (with header row)
    #[arg(value_name = "COORDS_CSV")]
    coords_csv: PathBuf,

    /// Dataset root holding image/ and label/<code>/
    #[arg(value_name = "IMAGE_DIR")]
    image_dir: PathBuf,

    /// Which label set to accumulate
    #[arg(value_enum, value_name = "DATA_TYPE")]
    data_type: DataType,

    /// Output directory
    #[arg(short, long, default_value = "heatmaps")]
    out_dir: PathBuf,

    /// Appended to every output file name
    #[arg(long, default_value = "")]
    suffix: String,

    /// JSON file overriding the canonical geometry and output toggles
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scale all canonical distances (1.0 gives 1100x1100 views)
    #[arg(long)]
    size_multiplier: Option<f64>,

    /// Also write every category stacked into one image
    #[arg(long)]
    big_stack: bool,

    /// Draw the macula quadrant box on the heatmaps
    #[arg(long)]
    draw_quadrants: bool,

    /// Write composite counts after every record (for animations)
    #[arg(long)]
    save_intermediate: bool,

    /// Prepare records on all cores
    #[arg(long)]
    parallel: bool,

    /// Prepared records waiting for the accumulator (with --parallel)
    #[arg(long, default_value_t = 8)]
    queue_depth: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => HeatmapConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HeatmapConfig::default(),
    };
    if let Some(multiplier) = args.size_multiplier {
        config.size_multiplier = multiplier;
    }
    config.big_stack_image |= args.big_stack;
    config.draw_quadrants |= args.draw_quadrants;
    config.save_intermediate |= args.save_intermediate;

    let frame = CanonicalFrame::new(&config)?;

    if !args.image_dir.exists() {
        anyhow::bail!("image_dir path \"{}\" does not exist", args.image_dir.display());
    }
    let categories = match args.data_type {
        DataType::Dr => CategorySet::retinopathy(),
        DataType::Vessels => CategorySet::vessels(),
    };

    info!("Using CSV file {:?}", args.coords_csv);
    info!("with image dir {:?}", args.image_dir);
    let records = fundusmap::dataset::load_landmarks(&args.coords_csv)
        .with_context(|| format!("Failed to read landmarks from {}", args.coords_csv.display()))?;

    let exporter = Exporter::new(&frame, &args.out_dir, &args.suffix)?;
    let source = FsMaskSource::new(&args.image_dir);

    let mut pipeline = HeatmapPipeline::new(frame.clone(), categories);
    if config.save_intermediate {
        pipeline = pipeline.with_snapshots(args.out_dir.clone(), args.suffix.clone());
    }

    let run = if args.parallel {
        pipeline.run_with_executor(&records, &source, args.queue_depth)?
    } else {
        pipeline.run(&records, &source)?
    };

    let mut report = exporter.write_all(&run.accumulator, config.big_stack_image);
    report.merge(run.snapshots);
    info!(
        "Wrote {} artifacts to {}",
        report.written.len(),
        exporter.out_dir().display()
    );
    if !report.is_complete() {
        warn!("{} artifacts could not be written", report.failures.len());
    }

    Ok(())
}
