//! Launches one benchmark child and samples its resident memory while it runs.
//!
//! A waiter thread owns the `Child`: it drains stdout/stderr and reaps the process,
//! then reports on a channel. The calling thread waits on that channel with a
//! timeout of one interval; every timeout means the child is still running and
//! one sample is taken. The waiter is always joined before `run` returns.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, SendError, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{HarnessError, Result};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Resident-memory summary over all samples of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStats {
    pub avg_mb: f64,
    pub max_mb: f64,
    pub samples: usize,
}

impl MemoryStats {
    /// `None` when nothing was sampled; zero is never reported in place of "no data".
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let avg_mb = samples.iter().sum::<f64>() / samples.len() as f64;
        let max_mb = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { avg_mb, max_mb, samples: samples.len() })
    }
}

#[derive(Debug)]
pub struct SampledRun {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
    pub memory: Option<MemoryStats>,
}

enum ChildState {
    Running,
    Exited(std::io::Result<Output>),
}

#[derive(Debug, Clone)]
pub struct MemorySampler {
    interval: Duration,
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

impl MemorySampler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `program` with `args` to completion, sampling its RSS every interval.
    ///
    /// Only a failure to start the child is an error. Exit status and stderr are
    /// returned as-is for the caller to log.
    pub fn run<S: AsRef<OsStr>>(&self, program: &OsStr, args: &[S]) -> Result<SampledRun> {
        let launch_error = |source: std::io::Error| HarnessError::ChildLaunch {
            program: PathBuf::from(program),
            source,
        };

        // The waiter exists before the child so a failed thread spawn never strands a process.
        let (child_tx, child_rx) = mpsc::channel::<Child>();
        let (tx, rx) = mpsc::channel();
        let waiter = thread::Builder::new()
            .name("child-waiter".to_string())
            .spawn(move || {
                if let Ok(child) = child_rx.recv() {
                    // receiver only disappears if the sampling loop panicked
                    let _ = tx.send(child.wait_with_output());
                }
            })
            .map_err(|e| HarnessError::child_io("starting waiter thread", e))?;

        let child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                drop(child_tx);
                let _ = waiter.join();
                return Err(launch_error(source));
            }
        };
        let pid = child.id();
        debug!(pid, program = %program.to_string_lossy(), "child started");

        if let Err(e) = hand_off(child, &child_tx) {
            let _ = waiter.join();
            return Err(HarnessError::child_io("handing child to waiter thread", e));
        }

        let mut samples = Vec::new();
        let output = loop {
            let state = match rx.recv_timeout(self.interval) {
                Ok(output) => ChildState::Exited(output),
                Err(RecvTimeoutError::Timeout) => ChildState::Running,
                Err(RecvTimeoutError::Disconnected) => ChildState::Exited(Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "waiter thread exited without reporting",
                ))),
            };

            // One more best-effort read on exit; it normally races with reaping.
            match sample_resident_mb(pid) {
                Ok(mb) => samples.push(mb),
                Err(e) => trace!(pid, "sample skipped: {e}"),
            }

            if let ChildState::Exited(output) = state {
                break output;
            }
        };

        if waiter.join().is_err() {
            debug!(pid, "waiter thread panicked");
        }
        let output = output.map_err(|e| HarnessError::child_io(format!("waiting for child {pid}"), e))?;

        let memory = MemoryStats::from_samples(&samples);
        debug!(pid, status = %output.status, samples = samples.len(), "child finished");

        Ok(SampledRun {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status,
            memory,
        })
    }
}

/// Pass `child` to the waiter thread. If the waiter is gone the child is
/// killed and reaped here instead.
fn hand_off(child: Child, waiter: &Sender<Child>) -> std::io::Result<()> {
    if let Err(SendError(mut child)) = waiter.send(child) {
        let _ = child.kill();
        child.wait()?;
        return Err(std::io::Error::new(std::io::ErrorKind::Other, "waiter thread is gone"));
    }
    Ok(())
}

/// Resident set size of `pid` in MB (kB / 1024).
///
/// Fails with `SamplingRace` if the process is gone, already a zombie, or the
/// pid now belongs to something that is not our child.
#[cfg(target_os = "linux")]
pub fn sample_resident_mb(pid: u32) -> Result<f64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status"))
        .map_err(|_| HarnessError::SamplingRace { pid })?;

    let mut rss_kb: Option<u64> = None;
    let mut parent: Option<u32> = None;
    for line in status.lines() {
        if let Some(value) = line.strip_prefix("VmRSS:") {
            rss_kb = value.split_whitespace().next().and_then(|raw| raw.parse().ok());
        } else if let Some(value) = line.strip_prefix("PPid:") {
            parent = value.trim().parse().ok();
        }
    }

    if parent != Some(std::process::id()) {
        return Err(HarnessError::SamplingRace { pid });
    }
    // zombies have no VmRSS line
    rss_kb
        .map(|kb| kb as f64 / 1024.0)
        .ok_or(HarnessError::SamplingRace { pid })
}

#[cfg(not(target_os = "linux"))]
pub fn sample_resident_mb(pid: u32) -> Result<f64> {
    use std::sync::Once;
    static WARN_ONCE: Once = Once::new();
    WARN_ONCE.call_once(|| {
        tracing::warn!("resident memory sampling is only supported on Linux; memory columns will be empty");
    });
    Err(HarnessError::SamplingRace { pid })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_samples_means_no_memory_stats() {
        assert_eq!(MemoryStats::from_samples(&[]), None);
    }

    #[test]
    fn memory_stats_average_and_peak() {
        let stats = MemoryStats::from_samples(&[10.0, 30.0, 20.0]).unwrap();
        assert_eq!(stats.avg_mb, 20.0);
        assert_eq!(stats.max_mb, 30.0);
        assert_eq!(stats.samples, 3);
    }

    #[test]
    fn wait_failure_is_not_a_launch_failure() {
        let err = HarnessError::child_io("waiting for child 7", std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(err, HarnessError::ChildIo { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_executable_is_a_launch_error() {
        let sampler = MemorySampler::default();
        let err = sampler
            .run(OsStr::new("./definitely-not-a-real-benchmark"), &["a", "b"])
            .unwrap_err();
        assert!(matches!(err, HarnessError::ChildLaunch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn fast_child_has_no_memory_samples() {
        let sampler = MemorySampler::new(Duration::from_secs(2));
        let run = sampler.run(OsStr::new("sh"), &["-c", "echo Score: 7"]).unwrap();
        assert_eq!(run.stdout.trim(), "Score: 7");
        assert_eq!(run.memory, None);
    }

    #[cfg(unix)]
    #[test]
    fn stderr_and_exit_code_are_captured_not_fatal() {
        let sampler = MemorySampler::new(Duration::from_millis(20));
        let run = sampler
            .run(OsStr::new("sh"), &["-c", "echo out; echo oops >&2; exit 3"])
            .unwrap();
        assert_eq!(run.stdout, "out\n");
        assert_eq!(run.stderr, "oops\n");
        assert_eq!(run.status.code(), Some(3));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn long_child_is_sampled() {
        let sampler = MemorySampler::new(Duration::from_millis(20));
        let run = sampler.run(OsStr::new("sleep"), &["0.5"]).unwrap();
        let memory = run.memory.expect("a half-second child should be sampled");
        assert!(memory.samples >= 2);
        assert!(memory.avg_mb > 0.0);
        assert!(memory.max_mb >= memory.avg_mb);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn child_is_reaped_when_waiter_is_gone() {
        let (tx, rx) = mpsc::channel::<Child>();
        drop(rx);
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();

        assert!(hand_off(child, &tx).is_err());
        // killed and waited on, so no process or zombie is left behind
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn foreign_pid_is_not_sampled() {
        // pid 1 is never our child
        assert!(matches!(sample_resident_mb(1), Err(HarnessError::SamplingRace { pid: 1 })));
    }
}
