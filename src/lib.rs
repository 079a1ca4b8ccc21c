//! Benchmark sweep harness for an external TFHE Smith-Waterman executable:
//! launches it over sizes x pairs x repetitions, samples its memory, parses its
//! timings and summarises each group.

pub mod error;
pub mod fasta;
pub mod manifest;
pub mod parser;
pub mod sampler;
pub mod sink;
pub mod stats;
pub mod sweep;
pub mod system_info;

pub use error::{HarnessError, Result};
pub use sweep::{Sweep, SweepConfig};
