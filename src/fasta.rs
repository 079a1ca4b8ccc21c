//! Random nucleotide inputs in the layout the sweep expects:
//! `{base}/{len}x{len}/seq{1,2}_{len}_{i}.fasta`, one sequence line per file.

use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::sweep::{pair_files, size_dir};

const NUCLEOTIDES: &[u8] = b"ACGT";

pub fn random_sequence<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
    (0..length)
        .map(|_| *NUCLEOTIDES.choose(rng).unwrap_or(&b'A') as char)
        .collect()
}

/// Write `count` sequence pairs for every length. Returns the number of files written.
pub fn generate_tree<R: Rng + ?Sized>(base: &Path, lengths: &[u32], count: u32, rng: &mut R) -> Result<usize> {
    let mut written = 0;

    for &length in lengths {
        let dir = size_dir(base, length);
        fs::create_dir_all(&dir).map_err(|e| HarnessError::io(format!("creating {}", dir.display()), e))?;

        for i in 1..=count {
            let (seq1, seq2) = pair_files(&dir, length, i);
            for path in [seq1, seq2] {
                let mut sequence = random_sequence(length as usize, rng);
                sequence.push('\n');
                fs::write(&path, sequence).map_err(|e| HarnessError::io(format!("writing {}", path.display()), e))?;
                written += 1;
            }
        }
        debug!(length, pairs = count, dir = %dir.display(), "generated sequences");
    }

    Ok(written)
}
