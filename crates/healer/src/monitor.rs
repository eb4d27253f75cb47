// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted monitor state and the LLM-fallback analysis cache
//!
//! `monitor-state.json` tracks per-session analysis budgets, pattern
//! counts, the serialized global breaker, and the recovery history that
//! deduplicates enhance-task actions. `llm-cache.json` is a
//! content-addressed cache of analyses with a TTL.

use crate::analyzer::Analysis;
use crate::persist::{load_json, save_json};
use chrono::{DateTime, TimeZone, Utc};
use lw_core::BreakerSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One applied (or attempted) task recovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub timestamp_ms: u64,
    pub success: bool,
}

/// The healer's persisted bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorState {
    /// LLM-fallback calls made this session
    pub llm_calls_this_session: u32,
    /// Wall-clock time of the last LLM-fallback call
    pub last_llm_call_ms: Option<u64>,
    /// Histogram of detected pattern names
    pub pattern_counts: HashMap<String, u64>,
    /// Hashes of errors already analyzed this session
    pub analyzed_errors: HashSet<String>,
    /// Serialized global breaker state
    pub breaker: Option<BreakerSnapshot>,
    /// Keyed by `taskId::exitReason`
    pub recovery_history: HashMap<String, RecoveryRecord>,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

impl MonitorState {
    /// Key for the recovery-deduplication map
    pub fn recovery_key(task_id: &lw_core::TaskId, exit_reason: &str) -> String {
        format!("{task_id}::{}", crate::hash::error_hash(exit_reason))
    }

    /// Reset the per-session counters, keeping cross-session history
    pub fn begin_session(&mut self) {
        self.llm_calls_this_session = 0;
        self.analyzed_errors.clear();
    }
}

/// Loads and saves `monitor-state.json`
pub struct MonitorStore {
    path: PathBuf,
}

impl MonitorStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("monitor-state.json"),
        }
    }

    pub fn load(&self) -> MonitorState {
        load_json(&self.path)
    }

    pub fn save(&self, state: &MonitorState) -> std::io::Result<()> {
        save_json(&self.path, state)
    }
}

/// One cached analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmCacheEntry {
    pub error_hash: String,
    pub analysis: Analysis,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Content-addressed analysis cache with a TTL (`llm-cache.json`)
pub struct LlmCache {
    path: PathBuf,
    entries: HashMap<String, LlmCacheEntry>,
}

impl LlmCache {
    pub fn load(state_dir: &Path) -> Self {
        let path = state_dir.join("llm-cache.json");
        Self {
            entries: load_json(&path),
            path,
        }
    }

    /// Cached analysis for a hash, unless expired
    pub fn get(&self, hash: &str, now_ms: u64) -> Option<&Analysis> {
        let entry = self.entries.get(hash)?;
        if entry.expires_at <= epoch_to_utc(now_ms) {
            return None;
        }
        Some(&entry.analysis)
    }

    pub fn insert(&mut self, hash: String, analysis: Analysis, now_ms: u64, ttl: Duration) {
        let cached_at = epoch_to_utc(now_ms);
        let expires_at = cached_at + chrono::TimeDelta::milliseconds(ttl.as_millis() as i64);
        self.entries.insert(
            hash.clone(),
            LlmCacheEntry {
                error_hash: hash,
                analysis,
                cached_at,
                expires_at,
            },
        );
    }

    /// Drop expired entries; returns how many were removed
    pub fn prune(&mut self, now_ms: u64) -> usize {
        let cutoff = epoch_to_utc(now_ms);
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > cutoff);
        before - self.entries.len()
    }

    pub fn save(&self) -> std::io::Result<()> {
        save_json(&self.path, &self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn epoch_to_utc(ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
