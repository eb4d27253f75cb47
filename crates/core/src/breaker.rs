// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key circuit breakers
//!
//! Closed counts consecutive failures; open refuses traffic until the
//! reset timeout has elapsed since the last failure; half-open admits a
//! bounded number of in-flight probes. The open→half-open transition is
//! lazy, taken on the next state query after the timeout.

use crate::clock::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Breaker tuning, shared by every breaker a registry creates
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long an open circuit refuses traffic after its last failure
    pub reset_timeout: Duration,
    /// In-flight probes admitted while half-open
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
        }
    }
}

/// Breaker position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Serializable view of a breaker, for persisted healer state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub successes: u64,
    pub failures: u64,
    /// Wall-clock time of the last recorded failure
    pub last_failure_epoch_ms: Option<u64>,
}

struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    last_failure_epoch_ms: Option<u64>,
    successes: u64,
    failures: u64,
    half_open_in_flight: u32,
}

impl BreakerInner {
    fn fresh() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            last_failure: None,
            last_failure_epoch_ms: None,
            successes: 0,
            failures: 0,
            half_open_in_flight: 0,
        }
    }
}

/// One closed/open/half-open state machine
pub struct CircuitBreaker<C: Clock> {
    config: BreakerConfig,
    clock: C,
    inner: Mutex<BreakerInner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(config: BreakerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(BreakerInner::fresh()),
        }
    }

    /// Rebuild a breaker from a persisted snapshot.
    ///
    /// The monotonic last-failure instant is reconstructed from the
    /// wall-clock age so reset timeouts keep counting across restarts.
    pub fn restore(config: BreakerConfig, clock: C, snapshot: &BreakerSnapshot) -> Self {
        let last_failure = snapshot.last_failure_epoch_ms.and_then(|then| {
            let age = clock.epoch_ms().saturating_sub(then);
            clock.now().checked_sub(Duration::from_millis(age))
        });
        let breaker = Self::new(config, clock);
        {
            let mut inner = breaker.inner.lock();
            inner.state = snapshot.state;
            inner.consecutive_failures = snapshot.consecutive_failures;
            inner.successes = snapshot.successes;
            inner.failures = snapshot.failures;
            inner.last_failure = last_failure;
            inner.last_failure_epoch_ms = snapshot.last_failure_epoch_ms;
        }
        breaker
    }

    /// Current state, after the lazy open→half-open transition
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    /// Whether a call may proceed. In half-open this admits the caller as
    /// an in-flight probe; the following `record_success` or
    /// `record_failure` releases the probe slot.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_calls {
                    inner.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Non-admitting availability check, used for lazy disabled-set cleanup
    pub fn allows_traffic(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => inner.half_open_in_flight < self.config.half_open_max_calls,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.successes += 1;
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_sub(1);
            }
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                inner.half_open_in_flight = 0;
            }
            BreakerState::Open => {}
        }
    }

    /// Record a failure. Returns true when this call opened the circuit.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.failures += 1;
        inner.last_failure = Some(self.clock.now());
        inner.last_failure_epoch_ms = Some(self.clock.epoch_ms());
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = BreakerState::Open;
                    return true;
                }
                false
            }
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.half_open_in_flight = 0;
                true
            }
            BreakerState::Open => false,
        }
    }

    /// Equivalent to constructing a fresh breaker
    pub fn reset(&self) {
        *self.inner.lock() = BreakerInner::fresh();
    }

    /// Force the circuit open now, as if the threshold had just been hit
    pub fn trip(&self) {
        let mut inner = self.inner.lock();
        inner.state = BreakerState::Open;
        inner.consecutive_failures = self.config.failure_threshold;
        inner.last_failure = Some(self.clock.now());
        inner.last_failure_epoch_ms = Some(self.clock.epoch_ms());
        inner.half_open_in_flight = 0;
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            successes: inner.successes,
            failures: inner.failures,
            last_failure_epoch_ms: inner.last_failure_epoch_ms,
        }
    }

    fn maybe_half_open(&self, inner: &mut BreakerInner) {
        if inner.state != BreakerState::Open {
            return;
        }
        let elapsed = inner
            .last_failure
            .map(|at| self.clock.now().saturating_duration_since(at));
        match elapsed {
            Some(age) if age >= self.config.reset_timeout => {
                inner.state = BreakerState::HalfOpen;
                inner.half_open_in_flight = 0;
            }
            // A restored snapshot may have lost its failure instant; treat
            // the timeout as already elapsed.
            None => {
                inner.state = BreakerState::HalfOpen;
                inner.half_open_in_flight = 0;
            }
            _ => {}
        }
    }
}

/// Lazily creates one breaker per key
pub struct BreakerRegistry<C: Clock> {
    config: BreakerConfig,
    clock: C,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker<C>>>>,
}

impl<C: Clock> BreakerRegistry<C> {
    pub fn new(config: BreakerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Breaker for a key, created closed on first use
    pub fn get(&self, key: &str) -> Arc<CircuitBreaker<C>> {
        let mut breakers = self.breakers.lock();
        Arc::clone(breakers.entry(key.to_string()).or_insert_with(|| {
            Arc::new(CircuitBreaker::new(self.config.clone(), self.clock.clone()))
        }))
    }

    /// Reset one key's breaker to fresh
    pub fn reset(&self, key: &str) {
        if let Some(breaker) = self.breakers.lock().get(key) {
            breaker.reset();
        }
    }

    pub fn reset_all(&self) {
        for breaker in self.breakers.lock().values() {
            breaker.reset();
        }
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
