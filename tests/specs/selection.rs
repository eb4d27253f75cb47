//! Seed scenario: round-robin over three models.

use crate::prelude::*;
use lw_core::{CliKind, SelectorConfig};
use lw_engine::ModelSelector;
use std::sync::Arc;

#[test]
fn round_robin_cycles_a_b_c_indefinitely() {
    let selector = ModelSelector::new(
        vec![
            model("a", CliKind::Claude),
            model("b", CliKind::Gemini),
            model("c", CliKind::Opencode),
        ],
        vec![],
        SelectorConfig::default(),
        breaker_config(),
        lw_core::FakeClock::new(),
    );

    let picks: Vec<String> = (0..9)
        .map(|_| selector.get_next().unwrap().name.to_string())
        .collect();
    assert_eq!(picks, ["a", "b", "c", "a", "b", "c", "a", "b", "c"]);
}

#[tokio::test]
async fn selector_is_consistent_under_concurrent_callers() {
    let selector = Arc::new(ModelSelector::new(
        vec![
            model("a", CliKind::Claude),
            model("b", CliKind::Gemini),
            model("c", CliKind::Opencode),
        ],
        vec![],
        SelectorConfig::default(),
        breaker_config(),
        lw_core::FakeClock::new(),
    ));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let selector = Arc::clone(&selector);
        handles.push(tokio::spawn(async move {
            (0..3)
                .map(|_| selector.get_next().unwrap().name.to_string())
                .collect::<Vec<_>>()
        }));
    }
    let mut all: Vec<String> = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    // Nine picks across three callers: each model exactly three times
    all.sort();
    assert_eq!(all, ["a", "a", "a", "b", "b", "b", "c", "c", "c"]);
}
