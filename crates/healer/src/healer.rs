// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The healer loop: symptoms in, corrective actions out
//!
//! Every line from the log stream runs through the pattern table. A
//! match with an auto-action executes it, gated by the global circuit
//! breaker; error-looking lines with no pattern escalate to the
//! LLM-fallback analyzer under a session cap, a cooldown, a TTL cache,
//! and per-error deduplication. Every completed action feeds the breaker
//! and the wisdom store, and state is persisted after each step.

use crate::actions::{ActionRunner, HealAction};
use crate::analyzer::FallbackAnalyzer;
use crate::hash::error_hash;
use crate::monitor::{LlmCache, MonitorState, MonitorStore, RecoveryRecord};
use crate::patterns::{enhance_task_action, PatternEngine, Severity};
use crate::watcher::LogLine;
use lw_core::{BreakerConfig, CircuitBreaker, Clock, TaskFailure, TaskId};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Healer tuning and state locations
#[derive(Debug, Clone)]
pub struct HealerConfig {
    /// Conventionally `<project>/.loopwork/ai-monitor`
    pub state_dir: PathBuf,
    /// Where scaffolded specs land
    pub specs_dir: PathBuf,
    /// Hard cap on LLM-fallback calls per session
    pub max_llm_calls_per_session: u32,
    /// Minimum spacing between LLM-fallback calls
    pub llm_cooldown: Duration,
    /// TTL for cached analyses
    pub cache_ttl: Duration,
    /// Wisdom entry expiry window
    pub wisdom_expiry: Duration,
    /// Successes before a wisdom entry is trusted
    pub min_trust_successes: u32,
    pub breaker: BreakerConfig,
}

impl HealerConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let root = project_root.into();
        Self {
            state_dir: root.join(".loopwork").join("ai-monitor"),
            specs_dir: root.join("specs"),
            max_llm_calls_per_session: 10,
            llm_cooldown: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            wisdom_expiry: Duration::from_secs(30 * 24 * 60 * 60),
            min_trust_successes: 3,
            breaker: BreakerConfig::default(),
        }
    }
}

/// What one line (or failure report) led to
#[derive(Debug, Clone, PartialEq)]
pub enum HealOutcome {
    /// A pattern's auto-action ran
    ActionTaken {
        pattern: String,
        action: String,
        success: bool,
    },
    /// A pattern matched but defines no action
    PatternRecorded { pattern: String },
    /// An error line was analyzed (freshly or from cache)
    Analyzed { hash: String, cached: bool },
    /// The analyzer call itself failed
    AnalysisFailed { hash: String },
    /// Recovery hints were appended to a task's spec
    Enhanced { task_id: TaskId },
    Skipped { reason: &'static str },
}

/// The log-observing recovery subsystem
pub struct Healer<C: Clock> {
    config: HealerConfig,
    clock: C,
    engine: PatternEngine,
    runner: ActionRunner,
    breaker: CircuitBreaker<C>,
    monitor_store: MonitorStore,
    monitor: Mutex<MonitorState>,
    wisdom: Mutex<crate::wisdom::WisdomStore>,
    cache: Mutex<LlmCache>,
    analyzer: Option<Arc<dyn FallbackAnalyzer>>,
}

impl<C: Clock> Healer<C> {
    /// Load persisted state and start a new session.
    pub fn new(config: HealerConfig, clock: C, runner: ActionRunner) -> Result<Self, regex::Error> {
        let engine = PatternEngine::standard()?;
        let now = clock.epoch_ms();

        let monitor_store = MonitorStore::new(&config.state_dir);
        let mut monitor = monitor_store.load();
        monitor.begin_session();

        let breaker = match &monitor.breaker {
            Some(snapshot) => {
                CircuitBreaker::restore(config.breaker.clone(), clock.clone(), snapshot)
            }
            None => CircuitBreaker::new(config.breaker.clone(), clock.clone()),
        };

        let mut wisdom =
            crate::wisdom::WisdomStore::load(&config.state_dir, config.wisdom_expiry, now);
        wisdom.begin_session();

        let mut cache = LlmCache::load(&config.state_dir);
        cache.prune(now);

        Ok(Self {
            config,
            clock,
            engine,
            runner,
            breaker,
            monitor_store,
            monitor: Mutex::new(monitor),
            wisdom: Mutex::new(wisdom),
            cache: Mutex::new(cache),
            analyzer: None,
        })
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn FallbackAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    pub fn monitor_snapshot(&self) -> MonitorState {
        self.monitor.lock().clone()
    }

    /// Whether the wisdom store trusts a signature yet
    pub fn is_trusted(&self, signature: &str) -> bool {
        self.wisdom
            .lock()
            .is_trusted(signature, self.config.min_trust_successes)
    }

    /// Process one log line.
    pub async fn handle_line(&self, line: &str) -> Option<HealOutcome> {
        if let Some(matched) = self.engine.match_line(line) {
            // Severity drives how loudly the match is recorded, nothing more
            match matched.severity {
                Severity::Info => tracing::debug!(pattern = matched.name, "pattern matched"),
                Severity::Warn => tracing::info!(pattern = matched.name, "pattern matched"),
                Severity::Error | Severity::High => {
                    tracing::warn!(pattern = matched.name, line, "pattern matched")
                }
                Severity::Critical => {
                    tracing::error!(pattern = matched.name, line, "pattern matched")
                }
            }
            self.monitor
                .lock()
                .pattern_counts
                .entry(matched.name.to_string())
                .and_modify(|c| *c += 1)
                .or_insert(1);

            let outcome = match self.engine.action_for(&matched) {
                None => HealOutcome::PatternRecorded {
                    pattern: matched.name.to_string(),
                },
                Some(action) => self.run_action(matched.name, action).await,
            };
            self.save_state();
            return Some(outcome);
        }

        if !looks_like_error(line) {
            return None;
        }
        let outcome = self.analyze_error(line).await;
        self.save_state();
        Some(outcome)
    }

    /// Task-failure recovery: at most one enhancement per (task, reason).
    pub async fn handle_task_failure(&self, failure: &TaskFailure) -> HealOutcome {
        let now = self.clock.epoch_ms();
        let key = MonitorState::recovery_key(&failure.task_id, &failure.exit_reason);
        if self.monitor.lock().recovery_history.contains_key(&key) {
            return HealOutcome::Skipped {
                reason: "already-enhanced",
            };
        }
        if !self.breaker.can_execute() {
            return HealOutcome::Skipped {
                reason: "breaker-open",
            };
        }

        let action = enhance_task_action(&failure.task_id, &failure.exit_reason, &failure.log_tail);
        self.monitor.lock().attempts += 1;
        let result = self.runner.run(&action).await;
        let success = result.is_ok();
        {
            let mut monitor = self.monitor.lock();
            monitor
                .recovery_history
                .insert(key, RecoveryRecord {
                    timestamp_ms: now,
                    success,
                });
            if success {
                monitor.successes += 1;
            } else {
                monitor.failures += 1;
            }
        }
        self.feed_back("enhance-task", success, now);
        self.save_state();

        if success {
            HealOutcome::Enhanced {
                task_id: failure.task_id.clone(),
            }
        } else {
            tracing::warn!(task_id = %failure.task_id, error = ?result.err(), "enhance-task failed");
            HealOutcome::ActionTaken {
                pattern: "task-failure".to_string(),
                action: "enhance-task".to_string(),
                success: false,
            }
        }
    }

    /// Drive the healer from a line stream and a failure feed.
    pub fn spawn_dispatcher(
        self: Arc<Self>,
        mut lines: mpsc::Receiver<LogLine>,
        mut failures: mpsc::Receiver<TaskFailure>,
    ) -> (oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    line = lines.recv() => match line {
                        Some(line) => {
                            self.handle_line(&line.line).await;
                        }
                        None => break,
                    },
                    failure = failures.recv() => {
                        if let Some(failure) = failure {
                            self.handle_task_failure(&failure).await;
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            self.save_state();
        });
        (shutdown_tx, handle)
    }

    /// Persist monitor, wisdom, and cache. Called after every action and
    /// at loop end; errors are logged, never fatal.
    pub fn save_state(&self) {
        {
            let mut monitor = self.monitor.lock();
            monitor.breaker = Some(self.breaker.snapshot());
            if let Err(e) = self.monitor_store.save(&monitor) {
                tracing::warn!(error = %e, "monitor state save failed");
            }
        }
        if let Err(e) = self.wisdom.lock().save() {
            tracing::warn!(error = %e, "wisdom save failed");
        }
        if let Err(e) = self.cache.lock().save() {
            tracing::warn!(error = %e, "llm cache save failed");
        }
    }

    async fn run_action(&self, pattern: &str, action: HealAction) -> HealOutcome {
        if !self.breaker.can_execute() {
            tracing::debug!(pattern, "healing skipped, global breaker open");
            return HealOutcome::Skipped {
                reason: "breaker-open",
            };
        }
        let now = self.clock.epoch_ms();
        self.monitor.lock().attempts += 1;

        if let HealAction::OpenGlobalBreaker { reason } = &action {
            tracing::warn!(%reason, "opening global healer breaker");
            self.breaker.trip();
            let mut monitor = self.monitor.lock();
            monitor.successes += 1;
            drop(monitor);
            self.wisdom.lock().record_success(pattern, now);
            return HealOutcome::ActionTaken {
                pattern: pattern.to_string(),
                action: action.name().to_string(),
                success: true,
            };
        }

        let result = self.runner.run(&action).await;
        let success = result.is_ok();
        if success {
            self.monitor.lock().successes += 1;
        } else {
            tracing::warn!(pattern, error = ?result.err(), "heal action failed");
            self.monitor.lock().failures += 1;
        }
        self.feed_back(pattern, success, now);
        HealOutcome::ActionTaken {
            pattern: pattern.to_string(),
            action: action.name().to_string(),
            success,
        }
    }

    async fn analyze_error(&self, line: &str) -> HealOutcome {
        let now = self.clock.epoch_ms();
        let hash = error_hash(line);

        if self.monitor.lock().analyzed_errors.contains(&hash) {
            return HealOutcome::Skipped {
                reason: "duplicate-error",
            };
        }
        if self.cache.lock().get(&hash, now).is_some() {
            self.monitor.lock().analyzed_errors.insert(hash.clone());
            return HealOutcome::Analyzed { hash, cached: true };
        }
        {
            let monitor = self.monitor.lock();
            if monitor.llm_calls_this_session >= self.config.max_llm_calls_per_session {
                return HealOutcome::Skipped {
                    reason: "session-cap",
                };
            }
            if let Some(last) = monitor.last_llm_call_ms {
                if now.saturating_sub(last) < self.config.llm_cooldown.as_millis() as u64 {
                    return HealOutcome::Skipped { reason: "cooldown" };
                }
            }
        }
        let Some(analyzer) = &self.analyzer else {
            return HealOutcome::Skipped {
                reason: "no-analyzer",
            };
        };
        if !self.breaker.can_execute() {
            return HealOutcome::Skipped {
                reason: "breaker-open",
            };
        }

        {
            let mut monitor = self.monitor.lock();
            monitor.llm_calls_this_session += 1;
            monitor.last_llm_call_ms = Some(now);
            monitor.attempts += 1;
        }
        match analyzer.analyze(line).await {
            Ok(analysis) => {
                tracing::info!(hash, root_cause = %analysis.root_cause, "llm fallback analysis complete");
                self.cache
                    .lock()
                    .insert(hash.clone(), analysis, now, self.config.cache_ttl);
                let mut monitor = self.monitor.lock();
                monitor.analyzed_errors.insert(hash.clone());
                monitor.successes += 1;
                drop(monitor);
                self.feed_back(&hash, true, now);
                HealOutcome::Analyzed {
                    hash,
                    cached: false,
                }
            }
            Err(e) => {
                tracing::warn!(hash, error = %e, "llm fallback analysis failed");
                self.monitor.lock().failures += 1;
                self.feed_back(&hash, false, now);
                HealOutcome::AnalysisFailed { hash }
            }
        }
    }

    /// Action feedback: breaker movement plus wisdom accounting
    fn feed_back(&self, signature: &str, success: bool, now: u64) {
        if success {
            self.breaker.record_success();
            self.wisdom.lock().record_success(signature, now);
        } else {
            self.breaker.record_failure();
            self.wisdom.lock().record_failure(signature, now);
        }
    }
}

/// The escalation filter for unmatched lines
fn looks_like_error(line: &str) -> bool {
    // Literal pattern; a compile failure here is a programming error.
    #[allow(clippy::unwrap_used)]
    fn pattern() -> regex::Regex {
        regex::Regex::new(r"(?i)\b(error|failed|exception|critical)\b").unwrap()
    }
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(pattern).is_match(line)
}

#[cfg(test)]
#[path = "healer_tests.rs"]
mod tests;
