//! Result sinks for the two output tables.
//!
//! The driver never opens files itself; callers hand it a [`ResultSink`].
//! [`CsvSink`] writes `all_runs.csv` and `summary.csv`, [`MemorySink`]
//! keeps rows in memory.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{HarnessError, Result};
use crate::stats::{FieldStats, GroupStats};
use crate::sweep::RunRecord;

pub const ALL_RUNS_FILE: &str = "all_runs.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

pub const ALL_RUNS_HEADER: [&str; 11] = [
    "size",
    "pair_index",
    "repetition",
    "encryption_time",
    "homomorphic_time",
    "decryption_time",
    "score",
    "start_pos",
    "end_pos",
    "mem_avg_MB",
    "mem_max_MB",
];

/// Receives rows as the sweep produces them. Errors here abort the sweep.
pub trait ResultSink {
    fn record_run(&mut self, record: &RunRecord) -> Result<()>;
    fn record_summary(&mut self, stats: &GroupStats) -> Result<()>;
}

pub struct CsvSink {
    runs: csv::Writer<File>,
    summary: csv::Writer<File>,
    runs_path: PathBuf,
    summary_path: PathBuf,
}

impl CsvSink {
    /// Create (or truncate) both tables in `dir` and write their headers.
    /// `dir` must already exist.
    pub fn create(dir: &Path) -> Result<Self> {
        let runs_path = dir.join(ALL_RUNS_FILE);
        let summary_path = dir.join(SUMMARY_FILE);

        let mut runs = open_writer(&runs_path)?;
        runs.write_record(ALL_RUNS_HEADER)
            .map_err(|e| HarnessError::csv(format!("writing header of {}", runs_path.display()), e))?;

        let mut summary = open_writer(&summary_path)?;
        summary
            .write_record(summary_header())
            .map_err(|e| HarnessError::csv(format!("writing header of {}", summary_path.display()), e))?;

        let mut sink = Self { runs, summary, runs_path, summary_path };
        sink.flush()?;
        Ok(sink)
    }

    pub fn runs_path(&self) -> &Path {
        &self.runs_path
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    pub fn flush(&mut self) -> Result<()> {
        self.runs
            .flush()
            .map_err(|e| HarnessError::io(format!("flushing {}", self.runs_path.display()), e))?;
        self.summary
            .flush()
            .map_err(|e| HarnessError::io(format!("flushing {}", self.summary_path.display()), e))
    }
}

impl ResultSink for CsvSink {
    fn record_run(&mut self, record: &RunRecord) -> Result<()> {
        self.runs
            .write_record(run_row(record))
            .map_err(|e| HarnessError::csv(format!("writing {}", self.runs_path.display()), e))?;
        self.runs
            .flush()
            .map_err(|e| HarnessError::io(format!("flushing {}", self.runs_path.display()), e))
    }

    fn record_summary(&mut self, stats: &GroupStats) -> Result<()> {
        self.summary
            .write_record(summary_row(stats))
            .map_err(|e| HarnessError::csv(format!("writing {}", self.summary_path.display()), e))?;
        self.summary
            .flush()
            .map_err(|e| HarnessError::io(format!("flushing {}", self.summary_path.display()), e))
    }
}

/// Keeps every row; used when the caller wants the results in-process.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub runs: Vec<RunRecord>,
    pub summaries: Vec<GroupStats>,
}

impl ResultSink for MemorySink {
    fn record_run(&mut self, record: &RunRecord) -> Result<()> {
        self.runs.push(record.clone());
        Ok(())
    }

    fn record_summary(&mut self, stats: &GroupStats) -> Result<()> {
        self.summaries.push(stats.clone());
        Ok(())
    }
}

fn open_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| HarnessError::csv(format!("creating {}", path.display()), e))
}

pub fn summary_header() -> Vec<String> {
    let mut header: Vec<String> = ["size", "pair_index", "repetitions"].iter().map(|s| s.to_string()).collect();
    for prefix in ["enc", "hom", "dec", "score", "mem_avg", "mem_max"] {
        for stat in ["mean", "stdev", "min", "max"] {
            header.push(format!("{prefix}_{stat}"));
        }
    }
    header
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn run_row(record: &RunRecord) -> Vec<String> {
    let r = &record.result;
    vec![
        record.size.to_string(),
        record.pair_index.to_string(),
        record.repetition.to_string(),
        cell(r.encryption_time),
        cell(r.homomorphic_time),
        cell(r.decryption_time),
        cell(r.score),
        cell(r.start_pos),
        cell(r.end_pos),
        cell(r.mem_avg_mb),
        cell(r.mem_max_mb),
    ]
}

pub fn summary_row(stats: &GroupStats) -> Vec<String> {
    let mut row = vec![
        stats.size.to_string(),
        stats.pair_index.to_string(),
        stats.repetitions.to_string(),
    ];
    for (_, field) in stats.fields() {
        let parts = field.map(|FieldStats { mean, stdev, min, max }| [mean, stdev, min, max]);
        match parts {
            Some(values) => row.extend(values.iter().map(f64::to_string)),
            None => row.extend(std::iter::repeat(String::new()).take(4)),
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Position, RunResult};

    fn record(rep: u32, result: RunResult) -> RunRecord {
        RunRecord { size: 8, pair_index: 3, repetition: rep, result }
    }

    #[test]
    fn summary_header_has_all_columns() {
        let expected = [
            "size", "pair_index", "repetitions",
            "enc_mean", "enc_stdev", "enc_min", "enc_max",
            "hom_mean", "hom_stdev", "hom_min", "hom_max",
            "dec_mean", "dec_stdev", "dec_min", "dec_max",
            "score_mean", "score_stdev", "score_min", "score_max",
            "mem_avg_mean", "mem_avg_stdev", "mem_avg_min", "mem_avg_max",
            "mem_max_mean", "mem_max_stdev", "mem_max_min", "mem_max_max",
        ];
        assert_eq!(summary_header(), expected);
    }

    #[test]
    fn nulls_render_as_empty_cells() {
        let row = run_row(&record(2, RunResult {
            score: Some(11),
            start_pos: Some(Position { row: 1, col: 2 }),
            ..Default::default()
        }));
        assert_eq!(row, vec!["8", "3", "2", "", "", "", "11", "(1, 2)", "", "", ""]);
    }

    #[test]
    fn summary_row_expands_each_metric() {
        let runs = vec![RunResult { encryption_time: Some(0.5), ..Default::default() }];
        let row = summary_row(&GroupStats::from_runs(8, 3, &runs));
        assert_eq!(row.len(), 27);
        assert_eq!(&row[..7], &["8", "3", "1", "0.5", "0", "0.5", "0.5"]);
        assert!(row[7..].iter().all(String::is_empty));
    }

    #[test]
    fn csv_sink_writes_headers_even_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::create(dir.path()).unwrap();
        drop(sink);

        let runs = std::fs::read_to_string(dir.path().join(ALL_RUNS_FILE)).unwrap();
        assert_eq!(runs.trim_end(), ALL_RUNS_HEADER.join(","));
        let summary = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.starts_with("size,pair_index,repetitions,enc_mean,enc_stdev"));
        assert_eq!(summary.lines().count(), 1);
    }

    #[test]
    fn csv_sink_appends_rows_as_they_arrive() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::create(dir.path()).unwrap();
        sink.record_run(&record(1, RunResult { score: Some(5), ..Default::default() })).unwrap();

        // flushed per row, readable before the sink is dropped
        let runs = std::fs::read_to_string(sink.runs_path()).unwrap();
        assert_eq!(runs.lines().nth(1), Some("8,3,1,,,,5,,,,"));

        sink.record_run(&record(2, RunResult { end_pos: Some(Position { row: 4, col: 4 }), ..Default::default() }))
            .unwrap();
        let runs = std::fs::read_to_string(sink.runs_path()).unwrap();
        assert_eq!(runs.lines().nth(2), Some("8,3,2,,,,,,\"(4, 4)\",,"));
    }
}
