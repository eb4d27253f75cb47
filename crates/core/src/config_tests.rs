// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn default_pools_cover_every_priority_class() {
    let pools = default_pools();
    for name in ["high", "medium", "low", "background"] {
        assert!(pools.contains_key(name), "missing pool {name}");
        assert!(pools[name].size >= 1);
    }
}

#[test]
fn background_pool_is_nicest() {
    let pools = default_pools();
    assert!(pools["background"].nice > pools["low"].nice);
    assert_eq!(pools["high"].nice, 0);
}

#[parameterized(
    first = { 0, 1_000 },
    second = { 1, 2_000 },
    third = { 2, 4_000 },
    capped = { 10, 30_000 },
)]
fn exponential_backoff_doubles_until_cap(attempt: u32, expected_ms: u64) {
    let config = RetryConfig::default();
    assert_eq!(
        config.backoff_delay(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[test]
fn linear_backoff_is_flat() {
    let config = RetryConfig {
        exponential: false,
        ..RetryConfig::default()
    };
    assert_eq!(config.backoff_delay(0), config.base_delay());
    assert_eq!(config.backoff_delay(7), config.base_delay());
}

#[test]
fn retry_config_parses_with_defaults() {
    let config: RetryConfig = serde_json::from_str(r#"{"max_attempts":5}"#).unwrap();
    assert_eq!(config.max_attempts, 5);
    assert!(config.exponential);
    assert_eq!(config.rate_limit_wait(), Duration::from_secs(60));
    assert!(config.retryable_errors.is_empty());
}

#[test]
fn executor_config_defaults() {
    let config = ExecutorConfig::default();
    assert_eq!(config.min_free_memory_mb, 512);
    assert_eq!(config.kill_grace(), Duration::from_secs(5));
    assert_eq!(config.default_pool, "medium");
    assert!(!config.retry_same_model);
}
