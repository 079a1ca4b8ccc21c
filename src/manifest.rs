use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{HarnessError, Result};
use crate::system_info::HostInfo;
use crate::sweep::{SweepConfig, SweepReport};

pub const MANIFEST_FILE: &str = "sweep_manifest.json";

/// JSON record of one sweep invocation, written next to the CSV tables.
#[derive(Debug, Serialize, Clone)]
pub struct SweepManifest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub config: SweepConfig,
    pub report: SweepReport,
    pub host: HostInfo,
}

/// Tracks wall time from the start of a sweep until its manifest is built.
pub struct ManifestTracker {
    run_id: String,
    started_at: DateTime<Utc>,
    start_time: Instant,
}

impl Default for ManifestTracker {
    fn default() -> Self {
        Self::start()
    }
}

impl ManifestTracker {
    pub fn start() -> Self {
        let started_at = Utc::now();
        Self {
            run_id: format!("sweep_{}", started_at.timestamp()),
            started_at,
            start_time: Instant::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn finish(self, config: &SweepConfig, report: &SweepReport) -> SweepManifest {
        SweepManifest {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            config: config.clone(),
            report: report.clone(),
            host: HostInfo::detect(),
        }
    }
}

impl SweepManifest {
    /// Write pretty-printed JSON to `dir/sweep_manifest.json`, replacing any previous one.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|source| HarnessError::Manifest { source })?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| HarnessError::io(format!("opening {}", path.display()), e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| HarnessError::io(format!("writing {}", path.display()), e))
    }
}
