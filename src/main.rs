// CLI entry point for the benchmark sweep

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};

use tfhe_sweep::error::HarnessError;
use tfhe_sweep::manifest::ManifestTracker;
use tfhe_sweep::sink::CsvSink;
use tfhe_sweep::sweep::{ScoreParams, Sweep, SweepConfig, DEFAULT_SCORES};

#[derive(Parser)]
#[command(name = "tfhe_sweep")]
#[command(about = "Run the TFHE aligner over a size/pair/repetition sweep with memory monitoring")]
struct Args {
    /// sequence sizes to benchmark, e.g. 4 8 16
    #[arg(long, num_args = 1.., required = true, value_parser = clap::value_parser!(u32).range(1..))]
    sizes: Vec<u32>,

    /// number of seq1/seq2 pairs tested per size
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pairs: u32,

    /// repetitions per pair
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    reps: u32,

    /// base directory holding the 4x4, 8x8, ... subdirectories
    #[arg(long = "fasta_dir", visible_alias = "fasta-dir", default_value = "fasta_sequences")]
    fasta_dir: PathBuf,

    /// path to the benchmarked executable
    #[arg(long, default_value = "./opt_tfhe")]
    executable: PathBuf,

    /// score parameters passed to the executable (match,mismatch,gap-open,gap-extend)
    #[arg(long, default_value = DEFAULT_SCORES, allow_hyphen_values = true)]
    scores: ScoreParams,

    /// directory that receives all_runs.csv, summary.csv and sweep_manifest.json
    #[arg(long = "output_dir", visible_alias = "output-dir", default_value = "results")]
    output_dir: PathBuf,

    /// memory sampling interval in milliseconds
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// log each child's stderr and sampling details
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl From<Args> for SweepConfig {
    fn from(args: Args) -> Self {
        SweepConfig {
            sizes: args.sizes,
            pairs: args.pairs,
            reps: args.reps,
            fasta_dir: args.fasta_dir,
            executable: args.executable,
            scores: args.scores,
            output_dir: args.output_dir,
            sample_interval: Duration::from_millis(args.interval_ms),
        }
    }
}

fn run(config: SweepConfig) -> Result<(), HarnessError> {
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| HarnessError::io(format!("creating {}", config.output_dir.display()), e))?;

    let tracker = ManifestTracker::start();
    info!(run_id = tracker.run_id(), output_dir = %config.output_dir.display(), "starting sweep");

    let mut sink = CsvSink::create(&config.output_dir)?;
    let sweep = Sweep::new(config);
    let report = sweep.run(&mut sink)?;
    sink.flush()?;

    let manifest = tracker.finish(sweep.config(), &report);
    manifest.save(&sweep.config().output_dir)?;

    info!(
        runs = report.runs,
        elapsed_seconds = manifest.elapsed_seconds,
        "results written to {} and {}",
        sink.runs_path().display(),
        sink.summary_path().display()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    if let Err(e) = run(args.into()) {
        error!("{e}");
        std::process::exit(1);
    }
}
