//! Sweep driver: sizes x pairs x repetitions, strictly one child at a time.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::parser::{self, RunResult};
use crate::sampler::{MemorySampler, DEFAULT_SAMPLE_INTERVAL};
use crate::sink::ResultSink;
use crate::stats::GroupStats;

pub const DEFAULT_SCORES: &str = "5,-3,-9,-1";

/// Match, mismatch, gap-open and gap-extend, passed to the child in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreParams(pub [i32; 4]);

impl Default for ScoreParams {
    fn default() -> Self {
        Self([5, -3, -9, -1])
    }
}

impl FromStr for ScoreParams {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| HarnessError::InvalidScores { input: s.to_string(), reason };

        let values = s
            .split(',')
            .map(|part| part.trim().parse::<i32>().map_err(|e| invalid(format!("{part:?}: {e}"))))
            .collect::<Result<Vec<_>>>()?;
        let values: [i32; 4] = values
            .try_into()
            .map_err(|v: Vec<i32>| invalid(format!("expected 4 comma-separated integers, got {}", v.len())))?;
        Ok(Self(values))
    }
}

impl fmt::Display for ScoreParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a},{b},{c},{d}")
    }
}

/// Everything the driver needs; built once by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SweepConfig {
    pub sizes: Vec<u32>,
    pub pairs: u32,
    pub reps: u32,
    pub fasta_dir: PathBuf,
    pub executable: PathBuf,
    pub scores: ScoreParams,
    pub output_dir: PathBuf,
    #[serde(rename = "sample_interval_ms", serialize_with = "serialize_millis")]
    pub sample_interval: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sizes: Vec::new(),
            pairs: 1,
            reps: 1,
            fasta_dir: PathBuf::from("fasta_sequences"),
            executable: PathBuf::from("./opt_tfhe"),
            scores: ScoreParams::default(),
            output_dir: PathBuf::from("results"),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

/// One child invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub size: u32,
    pub pair_index: u32,
    pub repetition: u32,
    pub scores: ScoreParams,
    pub seq1: PathBuf,
    pub seq2: PathBuf,
}

impl RunConfig {
    /// `seq1 seq2 s1 s2 s3 s4`
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![self.seq1.clone().into_os_string(), self.seq2.clone().into_os_string()];
        args.extend(self.scores.0.iter().map(|s| OsString::from(s.to_string())));
        args
    }
}

/// One all-runs row.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub size: u32,
    pub pair_index: u32,
    pub repetition: u32,
    pub result: RunResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub runs: usize,
    pub launch_failures: usize,
    pub child_io_failures: usize,
    pub nonzero_exits: usize,
    pub parse_errors: usize,
    pub skipped_sizes: usize,
    pub skipped_pairs: usize,
    pub groups: usize,
}

pub fn size_dir(base: &Path, size: u32) -> PathBuf {
    base.join(format!("{size}x{size}"))
}

pub fn pair_files(dir: &Path, size: u32, pair_index: u32) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("seq1_{size}_{pair_index}.fasta")),
        dir.join(format!("seq2_{size}_{pair_index}.fasta")),
    )
}

pub struct Sweep {
    config: SweepConfig,
    sampler: MemorySampler,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Self {
        let sampler = MemorySampler::new(config.sample_interval);
        Self { config, sampler }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the whole sweep, streaming rows into `sink`.
    ///
    /// Missing inputs, launch failures and unparsable output are logged and
    /// absorbed; only sink errors are returned.
    pub fn run<K: ResultSink>(&self, sink: &mut K) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for &size in &self.config.sizes {
            let dir = size_dir(&self.config.fasta_dir, size);
            if !dir.is_dir() {
                let e = HarnessError::MissingInput { path: dir };
                warn!(size, "{e}; skipping size");
                report.skipped_sizes += 1;
                continue;
            }

            for pair_index in 1..=self.config.pairs {
                let (seq1, seq2) = pair_files(&dir, size, pair_index);
                if let Some(missing) = [&seq1, &seq2].into_iter().find(|p| !p.is_file()) {
                    let e = HarnessError::MissingInput { path: missing.clone() };
                    warn!(size, pair_index, "{e}; skipping pair");
                    report.skipped_pairs += 1;
                    continue;
                }

                let mut results = Vec::new();
                for repetition in 1..=self.config.reps {
                    let run = RunConfig {
                        size,
                        pair_index,
                        repetition,
                        scores: self.config.scores,
                        seq1: seq1.clone(),
                        seq2: seq2.clone(),
                    };
                    let result = self.execute(&run, &mut report);
                    sink.record_run(&RunRecord { size, pair_index, repetition, result: result.clone() })?;
                    results.push(result);
                }

                if results.is_empty() {
                    continue;
                }
                let stats = GroupStats::from_runs(size, pair_index, &results);
                sink.record_summary(&stats)?;
                report.groups += 1;
            }
        }

        info!(
            runs = report.runs,
            groups = report.groups,
            launch_failures = report.launch_failures,
            child_io_failures = report.child_io_failures,
            parse_errors = report.parse_errors,
            skipped_sizes = report.skipped_sizes,
            skipped_pairs = report.skipped_pairs,
            "sweep finished"
        );
        Ok(report)
    }

    /// Run one repetition. Never fails: anything that goes wrong becomes empty fields.
    pub fn execute(&self, run: &RunConfig, report: &mut SweepReport) -> RunResult {
        let args = run.args();
        let command_line = std::iter::once(self.config.executable.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        info!(rep = run.repetition, "running: {command_line}");
        report.runs += 1;

        let sampled = match self.sampler.run(self.config.executable.as_os_str(), &args) {
            Ok(sampled) => sampled,
            Err(e) => {
                warn!(size = run.size, pair_index = run.pair_index, rep = run.repetition, "{e}");
                match e {
                    HarnessError::ChildLaunch { .. } => report.launch_failures += 1,
                    _ => report.child_io_failures += 1,
                }
                return RunResult::default();
            }
        };

        if !sampled.status.success() {
            warn!(rep = run.repetition, status = %sampled.status, "child exited unsuccessfully");
            report.nonzero_exits += 1;
        }
        if !sampled.stderr.trim().is_empty() {
            debug!(rep = run.repetition, stderr = %sampled.stderr.trim_end(), "child stderr");
        }

        let parsed = parser::parse_output(&sampled.stdout);
        for e in &parsed.errors {
            warn!(size = run.size, pair_index = run.pair_index, rep = run.repetition, "{e}");
        }
        report.parse_errors += parsed.errors.len();

        let mut result = parsed.result;
        if let Some(memory) = sampled.memory {
            result.mem_avg_mb = Some(memory.avg_mb);
            result.mem_max_mb = Some(memory.max_mb);
        }
        result
    }
}
