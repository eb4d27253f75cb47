// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration types for the execution core
//!
//! Loading and scaffolding these from disk is the surrounding product's
//! job; the core only defines the shapes and their defaults.

use crate::model::SelectionStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Declaration of one worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Hard concurrency limit, at least 1
    pub size: usize,
    /// OS nice-like hint forwarded to the spawner
    #[serde(default)]
    pub nice: i32,
    /// Free memory required before a spawn in this pool; 0 leaves only
    /// the executor's global floor in force
    #[serde(default)]
    pub memory_limit_mb: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 1,
            nice: 0,
            memory_limit_mb: 0,
        }
    }
}

impl PoolConfig {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

/// The standard pool map: one pool per priority class.
pub fn default_pools() -> HashMap<String, PoolConfig> {
    let mut pools = HashMap::new();
    pools.insert("high".to_string(), PoolConfig::with_size(4));
    pools.insert("medium".to_string(), PoolConfig::with_size(3));
    pools.insert(
        "low".to_string(),
        PoolConfig {
            size: 2,
            nice: 5,
            memory_limit_mb: 0,
        },
    );
    pools.insert(
        "background".to_string(),
        PoolConfig {
            size: 1,
            nice: 10,
            memory_limit_mb: 0,
        },
    );
    pools
}

/// Retry and backoff policy for the resilience runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_true")]
    pub exponential: bool,
    #[serde(default = "default_rate_limit_wait_ms")]
    pub rate_limit_wait_ms: u64,
    /// Error-message fragments treated as retryable transients
    #[serde(default)]
    pub retryable_errors: Vec<String>,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_rate_limit_wait_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            exponential: true,
            rate_limit_wait_ms: default_rate_limit_wait_ms(),
            retryable_errors: Vec::new(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit_wait_ms)
    }

    /// Delay before the next attempt. `attempt` is zero-based.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay();
        }
        let factor = self.multiplier.powi(attempt as i32);
        let scaled = (self.base_delay_ms as f64 * factor) as u64;
        Duration::from_millis(scaled.min(self.max_delay_ms))
    }
}

/// Model selector tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub strategy: SelectionStrategy,
    /// When false, per-model circuit breakers are not consulted
    #[serde(default = "default_true")]
    pub circuit_breaker_checks: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::RoundRobin,
            circuit_breaker_checks: true,
        }
    }
}

/// Executor-level knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Retry the same model before moving on
    #[serde(default)]
    pub retry_same_model: bool,
    #[serde(default = "default_max_retries_per_model")]
    pub max_retries_per_model: u32,
    /// Pre-spawn free-memory floor
    #[serde(default = "default_min_free_memory_mb")]
    pub min_free_memory_mb: u64,
    /// Grace period between SIGTERM and SIGKILL on timeout
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Pool used when neither feature nor priority resolves to one
    #[serde(default = "default_pool_name")]
    pub default_pool: String,
}

fn default_max_retries_per_model() -> u32 {
    2
}

fn default_min_free_memory_mb() -> u64 {
    512
}

fn default_kill_grace_ms() -> u64 {
    5_000
}

fn default_pool_name() -> String {
    "medium".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry_same_model: false,
            max_retries_per_model: default_max_retries_per_model(),
            min_free_memory_mb: default_min_free_memory_mb(),
            kill_grace_ms: default_kill_grace_ms(),
            default_pool: default_pool_name(),
        }
    }
}

impl ExecutorConfig {
    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
