// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wisdom store: learned pattern/action statistics across sessions
//!
//! Append-mostly catalog in `wisdom.json`. Entries expire after a
//! configured window; every recorded success refreshes the expiry. An
//! entry is trustworthy only once its success count clears the
//! configured floor.

use crate::monitor::epoch_to_utc;
use crate::persist::{load_json, save_json};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One learned (pattern, outcome) record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedPattern {
    /// Stable signature: a pattern name or a normalized error hash
    pub signature: String,
    pub success_count: u32,
    pub failure_count: u32,
    pub success_rate: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Free-form improvement notes
    #[serde(default)]
    pub notes: Vec<String>,
}

impl LearnedPattern {
    fn recompute_rate(&mut self) {
        let total = self.success_count + self.failure_count;
        self.success_rate = if total == 0 {
            0.0
        } else {
            f64::from(self.success_count) / f64::from(total)
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WisdomDoc {
    version: u32,
    last_updated: DateTime<Utc>,
    patterns: Vec<LearnedPattern>,
    session_count: u32,
    total_heals: u64,
    total_failures: u64,
}

impl Default for WisdomDoc {
    fn default() -> Self {
        Self {
            version: 1,
            last_updated: DateTime::<Utc>::default(),
            patterns: Vec::new(),
            session_count: 0,
            total_heals: 0,
            total_failures: 0,
        }
    }
}

/// Loads, mutates, and saves `wisdom.json`
pub struct WisdomStore {
    path: PathBuf,
    doc: WisdomDoc,
    expiry: Duration,
}

impl WisdomStore {
    /// Load the catalog, dropping entries already expired at `now_ms`.
    pub fn load(state_dir: &Path, expiry: Duration, now_ms: u64) -> Self {
        let path = state_dir.join("wisdom.json");
        let mut doc: WisdomDoc = load_json(&path);
        let cutoff = epoch_to_utc(now_ms);
        let before = doc.patterns.len();
        doc.patterns.retain(|p| p.expires_at > cutoff);
        if doc.patterns.len() < before {
            tracing::info!(
                expired = before - doc.patterns.len(),
                "pruned expired wisdom entries"
            );
        }
        Self { path, doc, expiry }
    }

    /// Start-of-session bookkeeping
    pub fn begin_session(&mut self) {
        self.doc.session_count += 1;
    }

    pub fn record_success(&mut self, signature: &str, now_ms: u64) {
        let now = epoch_to_utc(now_ms);
        let expiry = self.expiry;
        let entry = self.entry_mut(signature, now);
        entry.success_count += 1;
        entry.last_seen = now;
        entry.expires_at = now + delta(expiry);
        entry.recompute_rate();
        self.doc.total_heals += 1;
        self.doc.last_updated = now;
    }

    /// Failures refresh `last_seen` but never the expiry
    pub fn record_failure(&mut self, signature: &str, now_ms: u64) {
        let now = epoch_to_utc(now_ms);
        let entry = self.entry_mut(signature, now);
        entry.failure_count += 1;
        entry.last_seen = now;
        entry.recompute_rate();
        self.doc.total_failures += 1;
        self.doc.last_updated = now;
    }

    pub fn add_note(&mut self, signature: &str, note: impl Into<String>, now_ms: u64) {
        let now = epoch_to_utc(now_ms);
        self.entry_mut(signature, now).notes.push(note.into());
    }

    /// Trustworthy once the success count reaches the floor
    pub fn is_trusted(&self, signature: &str, min_successes: u32) -> bool {
        self.get(signature)
            .is_some_and(|p| p.success_count >= min_successes)
    }

    pub fn get(&self, signature: &str) -> Option<&LearnedPattern> {
        self.doc.patterns.iter().find(|p| p.signature == signature)
    }

    pub fn len(&self) -> usize {
        self.doc.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.patterns.is_empty()
    }

    pub fn total_heals(&self) -> u64 {
        self.doc.total_heals
    }

    pub fn save(&self) -> std::io::Result<()> {
        save_json(&self.path, &self.doc)
    }

    fn entry_mut(&mut self, signature: &str, now: DateTime<Utc>) -> &mut LearnedPattern {
        let expiry = self.expiry;
        if let Some(index) = self
            .doc
            .patterns
            .iter()
            .position(|p| p.signature == signature)
        {
            return &mut self.doc.patterns[index];
        }
        self.doc.patterns.push(LearnedPattern {
            signature: signature.to_string(),
            success_count: 0,
            failure_count: 0,
            success_rate: 0.0,
            first_seen: now,
            last_seen: now,
            expires_at: now + delta(expiry),
            notes: Vec::new(),
        });
        let last = self.doc.patterns.len() - 1;
        &mut self.doc.patterns[last]
    }
}

fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::milliseconds(duration.as_millis() as i64)
}

#[cfg(test)]
#[path = "wisdom_tests.rs"]
mod tests;
