//! Memory counters for the running process.
//!
//! Values are read from /proc/self/status, which reports sizes in kB.

use std::fs;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Memory usage of this process in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Resident set size (VmRSS).
    pub allocated: u64,
    /// Virtual memory reserved from the system (VmSize).
    pub sys: u64,
    /// Peak resident set size (VmHWM).
    pub peak_allocated: u64,
    /// Data + heap segment (VmData).
    pub data: u64,
    pub threads: u64,
}

impl MemoryStats {
    pub fn allocated_mb(&self) -> f64 {
        self.allocated as f64 / BYTES_PER_MB
    }

    pub fn sys_mb(&self) -> f64 {
        self.sys as f64 / BYTES_PER_MB
    }

    pub fn peak_allocated_mb(&self) -> f64 {
        self.peak_allocated as f64 / BYTES_PER_MB
    }

    pub fn data_mb(&self) -> f64 {
        self.data as f64 / BYTES_PER_MB
    }
}

/// Reads memory counters from /proc/self/status.
pub fn read_memory_stats() -> Result<MemoryStats, String> {
    let content = fs::read_to_string("/proc/self/status")
        .map_err(|e| format!("Failed to read /proc/self/status: {}", e))?;
    parse_status_content(&content)
}

/// Parses the content of a /proc/<pid>/status file.
///
/// VmRSS and VmSize are required; the remaining counters default to zero.
pub fn parse_status_content(content: &str) -> Result<MemoryStats, String> {
    let mut stats = MemoryStats::default();
    let mut have_rss = false;
    let mut have_size = false;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key {
            "VmRSS" => {
                stats.allocated = parse_kb_value(value)?;
                have_rss = true;
            }
            "VmSize" => {
                stats.sys = parse_kb_value(value)?;
                have_size = true;
            }
            "VmHWM" => stats.peak_allocated = parse_kb_value(value)?,
            "VmData" => stats.data = parse_kb_value(value)?,
            "Threads" => {
                stats.threads = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| format!("Failed to parse Threads: {}", e))?;
            }
            _ => {}
        }
    }

    if !(have_rss && have_size) {
        return Err("Failed to parse VmRSS or VmSize from status".to_string());
    }

    Ok(stats)
}

// Format: "   16384 kB"
fn parse_kb_value(value: &str) -> Result<u64, String> {
    let number = value.split_whitespace().next().unwrap_or_default();
    number
        .parse::<u64>()
        .map(|kb| kb * 1024)
        .map_err(|e| format!("Failed to parse kB value '{}': {}", value.trim(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tproc-status-page\n\
        State:\tS (sleeping)\n\
        Pid:\t4242\n\
        VmPeak:\t   10240 kB\n\
        VmSize:\t    4096 kB\n\
        VmHWM:\t    3072 kB\n\
        VmRSS:\t    2048 kB\n\
        VmData:\t    1024 kB\n\
        Threads:\t7\n";

    #[test]
    fn test_parse_status_content() {
        let stats = parse_status_content(STATUS).unwrap();
        assert_eq!(stats.allocated, 2048 * 1024);
        assert_eq!(stats.sys, 4096 * 1024);
        assert_eq!(stats.peak_allocated, 3072 * 1024);
        assert_eq!(stats.data, 1024 * 1024);
        assert_eq!(stats.threads, 7);
    }

    #[test]
    fn test_megabyte_conversion() {
        let stats = MemoryStats {
            allocated: 2_097_152,
            sys: 4_194_304,
            ..Default::default()
        };
        assert!((stats.allocated_mb() - 2.0).abs() < f64::EPSILON);
        assert!((stats.sys_mb() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_status_missing_fields() {
        // Kernel threads have no Vm* lines
        let result = parse_status_content("Name:\tkthreadd\nThreads:\t1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_status_invalid_number() {
        let result = parse_status_content("VmRSS:\tabc kB\nVmSize:\t1 kB\n");
        assert!(result.is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_self() {
        let stats = read_memory_stats().unwrap();
        assert!(stats.allocated > 0);
        assert!(stats.sys >= stats.allocated);
    }
}
