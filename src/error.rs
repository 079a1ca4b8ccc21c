//! Error taxonomy for the sweep harness.
//! Only the sink-layer variants (`Io`, `Csv`, `Manifest`) are allowed to abort a sweep;
//! everything else is logged and absorbed by the driver.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// A sweep directory or input sequence file does not exist.
    #[error("missing input: {}", .path.display())]
    MissingInput { path: PathBuf },

    /// The benchmarked executable could not be started.
    #[error("failed to launch {}: {source}", .program.display())]
    ChildLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The child started but supervising it failed (waiter thread, pipe reads, reaping).
    #[error("child I/O error: {context}: {source}")]
    ChildIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A recognised output line carried a value that could not be parsed.
    #[error("could not parse {field} from line {line:?}")]
    ParseField { field: &'static str, line: String },

    /// The child disappeared between the liveness check and the memory read.
    #[error("process {pid} vanished before it could be sampled")]
    SamplingRace { pid: u32 },

    #[error("invalid score parameters {input:?}: {reason}")]
    InvalidScores { input: String, reason: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialize sweep manifest: {source}")]
    Manifest {
        #[source]
        source: serde_json::Error,
    },
}

impl HarnessError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    pub fn child_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::ChildIo { context: context.into(), source }
    }

    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv { context: context.into(), source }
    }

    /// Whether this error must stop the whole sweep rather than a single unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Csv { .. } | Self::Manifest { .. })
    }
}
