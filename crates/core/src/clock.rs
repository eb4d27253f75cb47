// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Circuit breakers, wisdom expiry, and retry delays all read time through
//! this trait so tests can drive transitions without sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides monotonic and wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for elapsed-time comparisons
    fn now(&self) -> Instant;
    /// Wall-clock milliseconds since the Unix epoch, for persisted timestamps
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    current: Instant,
    epoch_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                current: Instant::now(),
                epoch_ms: 1_700_000_000_000,
            })),
        }
    }

    /// Advance both the monotonic and wall-clock readings
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.current += duration;
        state.epoch_ms += duration.as_millis() as u64;
    }

    /// Convenience for millisecond advances in tests
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Set the wall-clock reading directly
    pub fn set_epoch_ms(&self, ms: u64) {
        self.inner.lock().epoch_ms = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().current
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
