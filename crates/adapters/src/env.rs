// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::path::PathBuf;
use std::time::Duration;

fn parse_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok())
}

/// Spawn-probe timeout for spawn-mode detection (default: 5000ms).
pub fn probe_timeout() -> Duration {
    parse_u64("LOOPWORK_PROBE_TIMEOUT_MS")
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Forced free-memory reading in MB, for tests and constrained sandboxes.
pub fn fake_free_memory_mb() -> Option<u64> {
    parse_u64("LOOPWORK_FAKE_FREE_MEMORY_MB")
}

/// Override for the opencode vendor cache directory.
pub fn opencode_cache_dir() -> Option<PathBuf> {
    std::env::var("LOOPWORK_OPENCODE_CACHE_DIR")
        .ok()
        .map(PathBuf::from)
}
