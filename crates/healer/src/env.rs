// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the healer crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Watcher debounce after a filesystem change event (default: 100ms).
pub fn watcher_debounce() -> Duration {
    parse_duration_ms("LOOPWORK_WATCHER_DEBOUNCE_MS").unwrap_or(Duration::from_millis(100))
}

/// Watcher fallback poll interval (default: 1000ms).
pub fn watcher_poll() -> Duration {
    parse_duration_ms("LOOPWORK_WATCHER_POLL_MS").unwrap_or(Duration::from_secs(1))
}
