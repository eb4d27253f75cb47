//! Seed scenario: the breaker opens after the failure threshold.

use crate::prelude::*;
use lw_core::{CliKind, ModelName, SelectorConfig};
use lw_engine::ModelSelector;
use std::time::Duration;

#[test]
fn three_failures_disable_a_model_until_its_reset_timeout() {
    let clock = lw_core::FakeClock::new();
    let selector = ModelSelector::new(
        vec![model("a", CliKind::Claude), model("b", CliKind::Gemini)],
        vec![],
        SelectorConfig::default(),
        breaker_config(), // failure_threshold = 3
        clock.clone(),
    );
    let a = ModelName::new("a");

    assert!(!selector.record_failure(&a));
    assert!(!selector.record_failure(&a));
    assert!(selector.record_failure(&a), "third failure opens the circuit");

    // canExecute(a) is now false; selection skips straight to b
    assert!(!selector.is_model_available(&a));
    for _ in 0..4 {
        assert_eq!(selector.get_next().unwrap().name, "b");
    }

    // Monotonicity: nothing re-admits a before the reset timeout elapses
    clock.advance(Duration::from_secs(29));
    assert!(!selector.is_model_available(&a));

    clock.advance(Duration::from_secs(1));
    assert!(selector.is_model_available(&a), "half-open after 30s");
}

#[test]
fn selector_exhaustion_returns_none_after_both_pools_fail() {
    let selector = ModelSelector::new(
        vec![model("a", CliKind::Claude)],
        vec![model("b", CliKind::Gemini)],
        SelectorConfig::default(),
        breaker_config(),
        lw_core::FakeClock::new(),
    );
    for name in ["a", "b"] {
        let name = ModelName::new(name);
        for _ in 0..3 {
            selector.record_failure(&name);
        }
    }
    assert!(selector.get_next().is_none());
}
