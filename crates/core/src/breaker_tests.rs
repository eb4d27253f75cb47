// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn config() -> BreakerConfig {
    BreakerConfig {
        failure_threshold: 3,
        reset_timeout: Duration::from_secs(30),
        half_open_max_calls: 1,
    }
}

fn breaker() -> (CircuitBreaker<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (CircuitBreaker::new(config(), clock.clone()), clock)
}

#[test]
fn opens_at_the_failure_threshold() {
    let (breaker, _clock) = breaker();
    assert!(!breaker.record_failure());
    assert!(!breaker.record_failure());
    assert!(breaker.record_failure(), "third failure must open");
    assert_eq!(breaker.state(), BreakerState::Open);
    assert!(!breaker.can_execute());
}

#[test]
fn stays_open_until_the_reset_timeout() {
    let (breaker, clock) = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(29));
    assert!(!breaker.can_execute(), "29s is before the reset timeout");
    clock.advance(Duration::from_secs(1));
    assert!(breaker.can_execute(), "30s elapses the reset timeout");
    assert_eq!(breaker.state(), BreakerState::HalfOpen);
}

#[test]
fn half_open_admits_a_bounded_probe_count() {
    let (breaker, clock) = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(30));
    assert!(breaker.can_execute(), "first probe admitted");
    assert!(!breaker.can_execute(), "second concurrent probe refused");
}

#[test]
fn half_open_success_closes() {
    let (breaker, clock) = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(30));
    assert!(breaker.can_execute());
    breaker.record_success();
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert!(breaker.can_execute());
}

#[test]
fn half_open_failure_reopens_and_restarts_the_timeout() {
    let (breaker, clock) = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(30));
    assert!(breaker.can_execute());
    assert!(breaker.record_failure(), "reopening counts as opening");
    assert_eq!(breaker.state(), BreakerState::Open);

    clock.advance(Duration::from_secs(29));
    assert!(!breaker.can_execute(), "timeout restarts from the new failure");
    clock.advance(Duration::from_secs(1));
    assert!(breaker.can_execute());
}

#[test]
fn closed_success_decrements_toward_zero() {
    let (breaker, _clock) = breaker();
    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();
    breaker.record_success();
    breaker.record_success(); // never below zero
    // Two more failures stay below the threshold of 3
    assert!(!breaker.record_failure());
    assert!(!breaker.record_failure());
    assert_eq!(breaker.state(), BreakerState::Closed);
}

#[test]
fn reset_equals_a_fresh_breaker() {
    let (breaker, _clock) = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    breaker.reset();
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert!(breaker.can_execute());
    assert_eq!(breaker.snapshot(), BreakerSnapshot {
        state: BreakerState::Closed,
        consecutive_failures: 0,
        successes: 0,
        failures: 0,
        last_failure_epoch_ms: None,
    });
}

#[test]
fn snapshot_restore_preserves_the_open_window() {
    let clock = FakeClock::new();
    let breaker = CircuitBreaker::new(config(), clock.clone());
    for _ in 0..3 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(10));
    let snapshot = breaker.snapshot();

    // "Restart": a new breaker restored 10s after the failure
    let restored = CircuitBreaker::restore(config(), clock.clone(), &snapshot);
    assert_eq!(restored.state(), BreakerState::Open);
    assert!(!restored.can_execute());

    clock.advance(Duration::from_secs(20));
    assert!(restored.can_execute(), "30s total since last failure");
}

#[test]
fn registry_creates_lazily_and_shares_instances() {
    let clock = FakeClock::new();
    let registry = BreakerRegistry::new(config(), clock);
    let a = registry.get("model-a");
    let b = registry.get("model-a");
    a.record_failure();
    assert_eq!(b.snapshot().failures, 1, "same underlying breaker");

    registry.reset("model-a");
    assert_eq!(a.snapshot().failures, 0);
}

#[test]
fn trip_opens_immediately_and_recovers_normally() {
    let (breaker, clock) = breaker();
    breaker.trip();
    assert_eq!(breaker.state(), BreakerState::Open);
    assert!(!breaker.can_execute());
    clock.advance(Duration::from_secs(30));
    assert!(breaker.can_execute(), "tripped circuit half-opens on schedule");
}

#[test]
fn allows_traffic_does_not_consume_probe_slots() {
    let (breaker, clock) = breaker();
    for _ in 0..3 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(30));
    assert!(breaker.allows_traffic());
    assert!(breaker.allows_traffic(), "repeated checks stay true");
    assert!(breaker.can_execute(), "the probe slot is still free");
}
