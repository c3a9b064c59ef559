use anyhow::{Context, Result};
use clap::Parser;
use hornschunck_core::solver::{DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_ROWS_PER_BAND};
use hornschunck_cli::input;
use hornschunck_cli::render::{self, ColorMapping};
use hornschunck_core::{mean_flow, FieldStats, FloatBuffer, FlowConfig, HornSchunckSolver};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Horn–Schunck optical flow between two frames
#[derive(Parser, Debug)]
#[command(name = "hornschunck")]
#[command(about = "Dense optical flow between two images (Horn–Schunck)", long_about = None)]
struct Args {
    /// The first image for optical flow computation
    #[arg(long, default_value = "img1.pgm")]
    infile1: PathBuf,

    /// The second image for optical flow computation
    #[arg(long, default_value = "img2.pgm")]
    infile2: PathBuf,

    /// The flow magnitude image
    #[arg(long, default_value = "mag.pgm")]
    magimg: PathBuf,

    /// The flow direction image
    #[arg(long, default_value = "direction.ppm")]
    dirimg: PathBuf,

    /// The smoothing weight alpha > 0
    #[arg(short, long, default_value_t = DEFAULT_ALPHA)]
    alpha: f32,

    /// Number of Jacobi iterations
    #[arg(short, long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Rows per unit of parallel work
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_BAND)]
    rows_per_band: usize,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Log the mean flow every N iterations (0 = off)
    #[arg(short, long, default_value_t = 0)]
    report_every: usize,

    /// Write a JSON run summary to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

/// Machine-readable record of one run
#[derive(Debug, Serialize)]
struct RunSummary {
    config: FlowConfig,
    width: i32,
    height: i32,
    frame1: FieldStats,
    frame2: FieldStats,
    magnitude: FieldStats,
    mean_flow: [f32; 2],
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to build worker pool")?;
    }

    let config = FlowConfig {
        alpha: args.alpha,
        iterations: args.iterations,
        rows_per_band: args.rows_per_band,
    };
    let solver = HornSchunckSolver::new(config).context("invalid solver configuration")?;

    info!(
        infile1 = %args.infile1.display(),
        infile2 = %args.infile2.display(),
        magimg = %args.magimg.display(),
        dirimg = %args.dirimg.display(),
        "Computing optical flow"
    );

    let (f1, f2) = input::load_frame_pair(&args.infile1, &args.infile2)?;
    let stats1 = FieldStats::of_channel(&f1.interior(), 0)?;
    let stats2 = FieldStats::of_channel(&f2.interior(), 0)?;
    for (name, stats) in [("frame1", &stats1), ("frame2", &stats2)] {
        info!(
            frame = name,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            std_dev = stats.std_dev(),
            "Input statistics"
        );
    }

    let flow = solver.solve_with_observer(&f1, &f2, |iteration, current| {
        if iteration.checked_rem(args.report_every) == Some(0) {
            report_progress(&solver, iteration, current);
        }
    })?;

    let magnitude = solver.magnitude(&flow)?;
    let magnitude_stats = FieldStats::of_channel(&magnitude, 0)?;
    let mean = mean_flow(&flow)?;
    info!(
        mean_u = mean.x,
        mean_v = mean.y,
        max_magnitude = magnitude_stats.max,
        "Flow summary"
    );

    let mut scaled = magnitude;
    scaled.scale_to_unit_range();

    ColorMapping::Grayscale
        .render(&scaled)?
        .save(&args.magimg)
        .with_context(|| format!("failed to write {}", args.magimg.display()))?;

    let direction = render::direction_field(&scaled, &flow)?;
    ColorMapping::YCbCrDirection
        .render(&direction)?
        .save(&args.dirimg)
        .with_context(|| format!("failed to write {}", args.dirimg.display()))?;
    info!("Wrote flow images");

    if let Some(path) = &args.summary_json {
        let bounds = flow.bounds();
        let summary = RunSummary {
            config,
            width: bounds.width(),
            height: bounds.height(),
            frame1: stats1,
            frame2: stats2,
            magnitude: magnitude_stats,
            mean_flow: [mean.x, mean.y],
        };
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote run summary");
    }

    Ok(())
}

/// Log mean flow and mean magnitude of an intermediate iterate
fn report_progress(solver: &HornSchunckSolver, iteration: usize, current: &FloatBuffer) {
    let progress = mean_flow(current).and_then(|mean| {
        let magnitude = solver.magnitude(current)?;
        Ok((mean, FieldStats::of_channel(&magnitude, 0)?))
    });
    match progress {
        Ok((mean, stats)) => info!(
            iteration,
            mean_u = mean.x,
            mean_v = mean.y,
            mean_magnitude = stats.mean,
            "Relaxation progress"
        ),
        Err(err) => warn!(iteration, %err, "Could not summarise iterate"),
    }
}
