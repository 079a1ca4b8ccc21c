use serde::Serialize;

/// Host details recorded alongside each sweep
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub cpu_cores: usize,
    pub total_ram_gb: Option<f64>,
}

impl HostInfo {
    pub fn detect() -> Self {
        HostInfo {
            hostname: Self::detect_hostname(),
            os: std::env::consts::OS.to_string(),
            cpu_cores: num_cpus::get(),
            total_ram_gb: Self::detect_total_ram(),
        }
    }

    fn detect_hostname() -> String {
        std::fs::read_to_string("/proc/sys/kernel/hostname")
            .map(|name| name.trim().to_string())
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Total RAM from /proc/meminfo, if readable
    fn detect_total_ram() -> Option<f64> {
        let content = std::fs::read_to_string("/proc/meminfo").ok()?;
        content
            .lines()
            .find_map(|line| line.strip_prefix("MemTotal:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<f64>().ok())
            .map(|kb| kb / (1024.0 * 1024.0)) // KB to GB
    }
}
