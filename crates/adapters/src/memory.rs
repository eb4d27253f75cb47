// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-memory probe for the pre-spawn gate
//!
//! The executor refuses to launch a child when available memory drops
//! below its floor. Platforms without a probe report `None` and the gate
//! passes.

/// Available memory in MB, or `None` when the platform offers no probe.
///
/// `LOOPWORK_FAKE_FREE_MEMORY_MB` overrides the reading everywhere, which
/// tests and constrained sandboxes rely on.
pub async fn available_mb() -> Option<u64> {
    if let Some(forced) = crate::env::fake_free_memory_mb() {
        return Some(forced);
    }
    #[cfg(target_os = "linux")]
    {
        let meminfo = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
        parse_meminfo_mb(&meminfo)
    }
    #[cfg(target_os = "macos")]
    {
        use crate::subprocess::{run_with_timeout, MEMORY_PROBE_TIMEOUT};
        let cmd = tokio::process::Command::new("vm_stat");
        let output = run_with_timeout(cmd, MEMORY_PROBE_TIMEOUT, "vm_stat")
            .await
            .ok()?;
        parse_vm_stat_mb(&String::from_utf8_lossy(&output.stdout))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Parse `MemAvailable` out of /proc/meminfo content (kB units).
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn parse_meminfo_mb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / 1024)
}

/// Parse free + inactive pages out of `vm_stat` output.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn parse_vm_stat_mb(output: &str) -> Option<u64> {
    let page_size: u64 = output
        .lines()
        .next()
        .and_then(|line| {
            line.split("page size of")
                .nth(1)?
                .split_whitespace()
                .next()?
                .parse()
                .ok()
        })
        .unwrap_or(4096);

    let pages = |label: &str| -> u64 {
        output
            .lines()
            .find(|line| line.starts_with(label))
            .and_then(|line| line.split(':').nth(1))
            .and_then(|v| v.trim().trim_end_matches('.').parse::<u64>().ok())
            .unwrap_or(0)
    };

    let free = pages("Pages free");
    let inactive = pages("Pages inactive");
    if free == 0 && inactive == 0 {
        return None;
    }
    Some((free + inactive) * page_size / (1024 * 1024))
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
