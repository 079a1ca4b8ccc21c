//! Per-group descriptive statistics.

use crate::parser::RunResult;

/// Mean, population standard deviation, min and max of one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub mean: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary of every repetition sharing one (size, pair index).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub size: u32,
    pub pair_index: u32,
    /// Repetitions attempted, including ones that produced no data.
    pub repetitions: usize,
    pub encryption: Option<FieldStats>,
    pub homomorphic: Option<FieldStats>,
    pub decryption: Option<FieldStats>,
    pub score: Option<FieldStats>,
    pub mem_avg: Option<FieldStats>,
    pub mem_max: Option<FieldStats>,
}

impl GroupStats {
    /// Summarise one group. Each field is reduced independently over the
    /// runs that produced a value for it.
    pub fn from_runs(size: u32, pair_index: u32, runs: &[RunResult]) -> Self {
        let collect = |f: fn(&RunResult) -> Option<f64>| -> Option<FieldStats> {
            let values: Vec<f64> = runs.iter().filter_map(f).collect();
            describe(&values)
        };

        Self {
            size,
            pair_index,
            repetitions: runs.len(),
            encryption: collect(|r| r.encryption_time),
            homomorphic: collect(|r| r.homomorphic_time),
            decryption: collect(|r| r.decryption_time),
            score: collect(|r| r.score.map(|s| s as f64)),
            mem_avg: collect(|r| r.mem_avg_mb),
            mem_max: collect(|r| r.mem_max_mb),
        }
    }

    /// The six metrics in column order, paired with their column prefix.
    pub fn fields(&self) -> [(&'static str, Option<FieldStats>); 6] {
        [
            ("enc", self.encryption),
            ("hom", self.homomorphic),
            ("dec", self.decryption),
            ("score", self.score),
            ("mem_avg", self.mem_avg),
            ("mem_max", self.mem_max),
        ]
    }
}

/// Describe a sample. `None` for an empty slice; a single value has stdev 0.
pub fn describe(values: &[f64]) -> Option<FieldStats> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let stdev = if values.len() == 1 {
        0.0
    } else {
        (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(FieldStats { mean, stdev, min, max })
}
