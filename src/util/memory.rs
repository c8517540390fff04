//! Available-memory detection for adaptive build strategies.

use anyhow::{bail, Context, Result};

use crate::util::process::{CommandRunner, ProcessBuilder};

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * MB;

/// Reports how much memory a build may use.
pub trait MemoryProbe {
    /// Available memory in bytes.
    fn available_bytes(&self) -> Result<u64>;
}

/// Reads memory statistics from the operating system.
///
/// On macOS the figures come from `sysctl` and `vm_stat`, executed through
/// the injected runner.
pub struct SystemMemoryProbe<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> SystemMemoryProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        SystemMemoryProbe { runner }
    }

    fn darwin(&self) -> Result<u64> {
        let total = self
            .runner
            .run_cmd_output(&ProcessBuilder::new("sysctl").args(["-n", "hw.memsize"]))
            .context("failed to get total memory")?;
        let total: u64 = total
            .trim()
            .parse()
            .with_context(|| format!("failed to parse total memory: {:?}", total.trim()))?;

        let vm_stat = match self.runner.run_cmd_output(&ProcessBuilder::new("vm_stat")) {
            Ok(out) => out,
            Err(e) => {
                tracing::debug!("vm_stat failed, assuming half of memory is available: {}", e);
                return Ok(total / 2);
            }
        };

        let available = parse_vm_stat(&vm_stat);
        if available > total {
            return Ok(total * 8 / 10);
        }
        Ok(available)
    }

    fn windows(&self) -> Result<u64> {
        let out = self
            .runner
            .run_cmd_output(
                &ProcessBuilder::new("wmic").args(["OS", "get", "FreePhysicalMemory", "/value"]),
            )
            .context("failed to get free memory")?;

        parse_wmic_value(&out, "FreePhysicalMemory")
            .map(|kb| kb * 1024)
            .context("failed to parse wmic output")
    }
}

impl MemoryProbe for SystemMemoryProbe<'_> {
    fn available_bytes(&self) -> Result<u64> {
        match std::env::consts::OS {
            "linux" => {
                let meminfo = std::fs::read_to_string("/proc/meminfo")
                    .context("failed to read /proc/meminfo")?;
                parse_meminfo(&meminfo).context("no memory figures in /proc/meminfo")
            }
            "macos" => self.darwin(),
            "windows" => self.windows(),
            other => bail!("memory detection is not supported on {}", other),
        }
    }
}

/// Parse `/proc/meminfo`: `MemAvailable`, falling back to `MemFree` on old kernels.
pub fn parse_meminfo(contents: &str) -> Option<u64> {
    let mut available = None;
    let mut free = None;

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        match key.trim_end_matches(':') {
            "MemAvailable" => available = Some(kb * 1024),
            "MemFree" => free = Some(kb * 1024),
            _ => {}
        }
    }

    available.filter(|v| *v > 0).or(free)
}

/// Parse `vm_stat` output: free plus inactive pages, in bytes.
pub fn parse_vm_stat(output: &str) -> u64 {
    let mut page_size = 4096;
    let mut free = 0;
    let mut inactive = 0;

    for line in output.lines() {
        if let Some(rest) = line.split("page size of ").nth(1) {
            if let Some(size) = rest.split_whitespace().next().and_then(|s| s.parse().ok()) {
                page_size = size;
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(pages) = value.trim().trim_end_matches('.').parse::<u64>() else {
            continue;
        };
        match key.trim() {
            "Pages free" => free = pages,
            "Pages inactive" => inactive = pages,
            _ => {}
        }
    }

    (free + inactive) * page_size
}

fn parse_wmic_value(output: &str, key: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(|v| v.trim().parse().ok())
    })
}

/// Parse a memory limit such as `4G` or `512M` into bytes.
pub fn parse_memory_limit(limit: &str) -> Option<u64> {
    let limit = limit.trim();
    let (number, unit) = if let Some(n) = limit.strip_suffix(['G', 'g']) {
        (n, GB)
    } else if let Some(n) = limit.strip_suffix(['M', 'm']) {
        (n, MB)
    } else {
        return None;
    };
    number
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n * unit)
}

/// Format a byte count for humans.
pub fn format_memory(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else {
        format!("{} MB", bytes / MB)
    }
}
