// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-healer: the self-observing recovery subsystem
//!
//! Tails the process's own log, matches lines against an ordered pattern
//! table, and turns recognized symptoms into corrective filesystem
//! actions. Outcomes feed a global circuit breaker and a persisted
//! wisdom catalog so the healer learns which patterns are worth acting
//! on across sessions.

pub mod actions;
pub mod analyzer;
pub mod env;
pub mod hash;
pub mod healer;
pub mod monitor;
pub mod patterns;
mod persist;
pub mod watcher;
pub mod wisdom;

pub use actions::{ActionRunner, HealAction};
pub use analyzer::{Analysis, FallbackAnalyzer};
pub use healer::{HealOutcome, Healer, HealerConfig};
pub use hash::{error_hash, normalize_error};
pub use monitor::{LlmCache, MonitorState, MonitorStore, RecoveryRecord};
pub use patterns::{PatternEngine, PatternMatch, Severity};
pub use watcher::{LogLine, LogWatcher, WatcherConfig};
pub use wisdom::{LearnedPattern, WisdomStore};

#[cfg(any(test, feature = "test-support"))]
pub use analyzer::FakeAnalyzer;
