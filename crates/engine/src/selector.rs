// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strategy-driven model selection over primary and fallback pools
//!
//! The selector owns a per-model breaker registry. A model whose breaker
//! opens lands in the disabled set and leaves the candidate pool; it is
//! lazily re-admitted when `is_model_available` observes the breaker
//! allowing traffic again.

use lw_core::breaker::{BreakerConfig, BreakerRegistry};
use lw_core::{Clock, ModelConfig, ModelName, SelectionStrategy, SelectorConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Observable selector health, for status surfaces and tests
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub available: Vec<ModelName>,
    pub disabled: Vec<ModelName>,
    pub retry_counts: HashMap<ModelName, u32>,
    pub using_fallback: bool,
}

struct SelectorState {
    primary_index: usize,
    fallback_index: usize,
    using_fallback: bool,
    disabled: HashSet<ModelName>,
    retry_counts: HashMap<ModelName, u32>,
}

impl SelectorState {
    fn fresh() -> Self {
        Self {
            primary_index: 0,
            fallback_index: 0,
            using_fallback: false,
            disabled: HashSet::new(),
            retry_counts: HashMap::new(),
        }
    }
}

/// Chooses the next model config to try
pub struct ModelSelector<C: Clock> {
    primary: Vec<ModelConfig>,
    fallback: Vec<ModelConfig>,
    config: SelectorConfig,
    breakers: BreakerRegistry<C>,
    state: Mutex<SelectorState>,
}

impl<C: Clock> ModelSelector<C> {
    /// Build a selector. Entries with `enabled: false` are dropped here
    /// and never participate in selection.
    pub fn new(
        primary: Vec<ModelConfig>,
        fallback: Vec<ModelConfig>,
        config: SelectorConfig,
        breaker_config: BreakerConfig,
        clock: C,
    ) -> Self {
        Self {
            primary: primary.into_iter().filter(|m| m.enabled).collect(),
            fallback: fallback.into_iter().filter(|m| m.enabled).collect(),
            config,
            breakers: BreakerRegistry::new(breaker_config, clock),
            state: Mutex::new(SelectorState::fresh()),
        }
    }

    /// Total candidates across both pools
    pub fn total_model_count(&self) -> usize {
        self.primary.len() + self.fallback.len()
    }

    /// Next candidate under the strategy, or `None` when exhausted.
    ///
    /// Each call serializes on the selector state, so concurrent callers
    /// see consistent round-robin indices.
    pub fn get_next(&self) -> Option<ModelConfig> {
        let mut state = self.state.lock();
        let budget = self.total_model_count();
        for _ in 0..budget {
            let pool: Vec<&ModelConfig> = self
                .current_pool(&state)
                .iter()
                .filter(|m| !state.disabled.contains(&m.name))
                .collect();

            if pool.is_empty() {
                if !state.using_fallback && !self.fallback.is_empty() {
                    tracing::info!("primary pool exhausted, switching to fallback");
                    state.using_fallback = true;
                    continue;
                }
                return None;
            }

            let candidate = match self.config.strategy {
                SelectionStrategy::RoundRobin => {
                    let index = if state.using_fallback {
                        &mut state.fallback_index
                    } else {
                        &mut state.primary_index
                    };
                    let chosen = pool[*index % pool.len()];
                    *index += 1;
                    chosen
                }
                SelectionStrategy::Priority => pool[0],
                SelectionStrategy::CostAware => {
                    // min_by_key keeps the first minimum, preserving
                    // original order on ties
                    match pool.iter().min_by_key(|m| m.effective_cost()) {
                        Some(cheapest) => *cheapest,
                        None => continue,
                    }
                }
                SelectionStrategy::Random => {
                    use rand::Rng;
                    pool[rand::rng().random_range(0..pool.len())]
                }
            };

            if self.config.circuit_breaker_checks
                && !self.breakers.get(candidate.name.as_str()).can_execute()
            {
                tracing::debug!(model = %candidate.name, "candidate vetoed by circuit breaker");
                continue;
            }
            return Some(candidate.clone());
        }
        None
    }

    /// Record a successful call: clears the model's retry counter and
    /// feeds its breaker.
    pub fn record_success(&self, name: &ModelName) {
        let mut state = self.state.lock();
        state.retry_counts.insert(name.clone(), 0);
        drop(state);
        self.breakers.get(name.as_str()).record_success();
    }

    /// Record a failed call. Returns true when this failure opened the
    /// model's breaker (the model is then disabled).
    pub fn record_failure(&self, name: &ModelName) -> bool {
        {
            let mut state = self.state.lock();
            *state.retry_counts.entry(name.clone()).or_insert(0) += 1;
        }
        let opened = self.breakers.get(name.as_str()).record_failure();
        if opened {
            tracing::warn!(model = %name, "circuit breaker opened, disabling model");
            self.state.lock().disabled.insert(name.clone());
        }
        opened
    }

    /// Whether a model may receive traffic. Re-checks the breaker and
    /// lazily removes the model from the disabled set once the breaker
    /// allows traffic again.
    pub fn is_model_available(&self, name: &ModelName) -> bool {
        let allowed = self.breakers.get(name.as_str()).allows_traffic();
        if allowed {
            self.state.lock().disabled.remove(name);
        }
        allowed
    }

    /// Force selection into the fallback pool (quota exhaustion)
    pub fn switch_to_fallback(&self) {
        let mut state = self.state.lock();
        if !state.using_fallback {
            tracing::warn!("switching model selection to fallback pool");
            state.using_fallback = true;
        }
    }

    pub fn using_fallback(&self) -> bool {
        self.state.lock().using_fallback
    }

    /// Observationally equal to a freshly constructed selector
    pub fn reset(&self) {
        *self.state.lock() = SelectorState::fresh();
        self.breakers.reset_all();
    }

    /// Clear one model's retry count, disabled flag, and breaker
    pub fn reset_model(&self, name: &ModelName) {
        let mut state = self.state.lock();
        state.retry_counts.remove(name);
        state.disabled.remove(name);
        drop(state);
        self.breakers.reset(name.as_str());
    }

    pub fn health_status(&self) -> HealthStatus {
        let state = self.state.lock();
        let all = self.primary.iter().chain(self.fallback.iter());
        let (mut available, mut disabled) = (Vec::new(), Vec::new());
        for model in all {
            if state.disabled.contains(&model.name) {
                disabled.push(model.name.clone());
            } else {
                available.push(model.name.clone());
            }
        }
        HealthStatus {
            available,
            disabled,
            retry_counts: state.retry_counts.clone(),
            using_fallback: state.using_fallback,
        }
    }

    fn current_pool(&self, state: &SelectorState) -> &[ModelConfig] {
        if state.using_fallback {
            &self.fallback
        } else {
            &self.primary
        }
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
