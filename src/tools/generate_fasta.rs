// Generates random nucleotide pairs for the sweep:
// fasta_sequences/{len}x{len}/seq{1,2}_{len}_{i}.fasta

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use tfhe_sweep::fasta;

#[derive(Parser)]
#[command(name = "generate_fasta")]
#[command(about = "Generate random nucleotide sequence pairs")]
struct Args {
    /// sequence lengths, e.g. 4 8 16 32 64
    #[arg(long, num_args = 1.., required = true, value_parser = clap::value_parser!(u32).range(1..))]
    lengths: Vec<u32>,

    /// number of sequence pairs per length
    #[arg(long)]
    num: u32,

    /// base output directory
    #[arg(long, default_value = "fasta_sequences")]
    output_dir: PathBuf,

    /// seed for reproducible sequences (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt().with_target(false).init();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match fasta::generate_tree(&args.output_dir, &args.lengths, args.num, &mut rng) {
        Ok(files) => info!("{} random sequences generated in folder: {}", files, args.output_dir.display()),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
