// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI executor: one task's lifecycle around child processes
//!
//! Compose prompt → acquire slot → (select model → spawn → stream →
//! classify)* under the resilience runner → release slot. The slot is
//! held by an RAII guard so every exit path, including panics inside an
//! attempt, releases exactly once.

use crate::pool::{SlotGuard, WorkerPoolManager};
use crate::resilience::ResilienceRunner;
use crate::selector::ModelSelector;
use lw_adapters::spawner::{
    ProcessSpawner, Signal, SpawnMode, SpawnModeDetector, SpawnOptions, SpawnedChild,
};
use lw_adapters::{cli_path, memory, LogSink, StrategyRegistry};
use lw_core::{
    Clock, ExecError, ExecEvent, ExecutorConfig, Priority, RetryConfig, TaskFailure, TaskId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How much of the output file feeds the healer's recovery analysis
const LOG_TAIL_BYTES: usize = 2048;

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub task_id: Option<TaskId>,
    pub worker_id: Option<String>,
    pub priority: Priority,
    /// Routes to a pool of the same name when one is declared
    pub feature: Option<String>,
    /// Extra per-invocation env entries (API keys, permission grants)
    pub permissions: Vec<(String, String)>,
}

/// Collaborators the executor composes over
pub struct ExecutorDeps<C: Clock> {
    pub pools: Arc<WorkerPoolManager>,
    pub selector: Arc<ModelSelector<C>>,
    pub spawner: Arc<dyn ProcessSpawner>,
    pub strategies: StrategyRegistry,
    pub sink: LogSink,
}

/// Drains tasks by dispatching them to vendor CLIs
pub struct CliExecutor<C: Clock> {
    pools: Arc<WorkerPoolManager>,
    selector: Arc<ModelSelector<C>>,
    spawner: Arc<dyn ProcessSpawner>,
    strategies: StrategyRegistry,
    sink: LogSink,
    config: ExecutorConfig,
    retry: RetryConfig,
    event_tx: Option<mpsc::Sender<ExecEvent>>,
    failure_tx: Option<mpsc::Sender<TaskFailure>>,
    cancel: CancellationToken,
    preamble_path: Option<PathBuf>,
    resolver: PathResolver,
    /// Preferred pseudoterminal spawner; probed once, pipe on failure
    pty_spawner: Option<Arc<dyn ProcessSpawner>>,
    mode_detector: SpawnModeDetector,
}

type PathResolver = Box<dyn Fn(&lw_core::CliKind) -> Option<PathBuf> + Send + Sync>;

impl<C: Clock> CliExecutor<C> {
    pub fn new(deps: ExecutorDeps<C>, config: ExecutorConfig, retry: RetryConfig) -> Self {
        Self {
            pools: deps.pools,
            selector: deps.selector,
            spawner: deps.spawner,
            strategies: deps.strategies,
            sink: deps.sink,
            config,
            retry,
            event_tx: None,
            failure_tx: None,
            cancel: CancellationToken::new(),
            preamble_path: None,
            resolver: Box::new(|kind| cli_path::resolve(kind)),
            pty_spawner: None,
            mode_detector: SpawnModeDetector::new(),
        }
    }

    /// Emit lifecycle events for the plugin hook bus
    pub fn with_events(mut self, tx: mpsc::Sender<ExecEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Report task failures to the healer's recovery path
    pub fn with_failure_feed(mut self, tx: mpsc::Sender<TaskFailure>) -> Self {
        self.failure_tx = Some(tx);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Plugin-injected capability preamble prepended to every prompt
    pub fn with_capability_preamble(mut self, path: impl Into<PathBuf>) -> Self {
        self.preamble_path = Some(path.into());
        self
    }

    /// Prefer a pseudoterminal spawner. Its first spawn is probed once;
    /// on failure every launch transparently uses the pipe spawner.
    pub fn with_pty_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.pty_spawner = Some(spawner);
        self
    }

    /// Replace PATH-based binary discovery (tests, hermetic installs)
    pub fn with_path_resolver(
        mut self,
        resolver: impl Fn(&lw_core::CliKind) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Execute one task's prompt. Returns 0 on success; failures surface
    /// as typed errors after the retry budget is spent.
    pub async fn execute(
        &self,
        prompt: &str,
        output_file: &Path,
        timeout_secs: u64,
        options: ExecOptions,
    ) -> Result<i32, ExecError> {
        let task_id = options
            .task_id
            .clone()
            .unwrap_or_else(|| TaskId::new("adhoc"));

        // 1. Compose and persist the final prompt for post-mortem
        let final_prompt = self.compose_prompt(prompt).await;
        persist_prompt(output_file, &final_prompt).await?;

        // 2. Route to a pool, 3. acquire a slot with RAII release
        let pool_name = self
            .pools
            .pool_for(options.priority, options.feature.as_deref());
        let slot = self
            .pools
            .acquire(Some(&pool_name), options.task_id.clone(), None)
            .await
            .map_err(|e| ExecError::fatal(format!("pool acquire failed: {e}")))?;
        let _guard = SlotGuard::new(Arc::clone(&self.pools), slot);

        self.emit(ExecEvent::TaskStarted {
            task_id: task_id.clone(),
            pool: pool_name.clone().into(),
        })
        .await;
        match &options.worker_id {
            Some(worker) => self.log_line(&format!(
                "task {task_id} started in pool {pool_name} ({slot}) by worker {worker}"
            )),
            None => self.log_line(&format!(
                "task {task_id} started in pool {pool_name} ({slot})"
            )),
        }

        // 4. Retry budget: every model, each retried per config, plus one
        let per_model = if self.config.retry_same_model {
            self.config.max_retries_per_model
        } else {
            1
        };
        let max_attempts = self.selector.total_model_count() as u32 * per_model + 1;
        let runner = ResilienceRunner::with_cancellation(
            RetryConfig {
                max_attempts,
                ..self.retry.clone()
            },
            self.cancel.clone(),
        );

        let task_ref = &task_id;
        let prompt_ref = final_prompt.as_str();
        let options_ref = &options;
        let pool_ref = pool_name.as_str();
        let outcome = runner
            .execute(move |attempt| {
                self.run_attempt(
                    attempt,
                    task_ref,
                    prompt_ref,
                    output_file,
                    timeout_secs,
                    options_ref,
                    pool_ref,
                )
            })
            .await;

        if let Some(won) = outcome.value {
            self.emit(ExecEvent::TaskCompleted {
                task_id: task_id.clone(),
                model: won.model,
                exit_code: won.exit_code,
            })
            .await;
            self.log_line(&format!("task {task_id} completed"));
            return Ok(won.exit_code);
        }

        // 5. Runner failure: report, feed the healer, surface fatal
        let error = outcome
            .error
            .unwrap_or_else(|| ExecError::fatal("all CLI configurations failed"));
        self.emit(ExecEvent::TaskFailed {
            task_id: task_id.clone(),
            error: error.to_string(),
        })
        .await;
        self.log_line(&format!("task {task_id} failed: {error}"));
        self.report_failure(&task_id, &error, output_file).await;

        if error == ExecError::Canceled {
            return Err(error);
        }
        Err(ExecError::fatal(format!(
            "all CLI configurations failed: {error}"
        )))
    }

    /// One retry body: select → prepare → gate → spawn → stream → classify
    #[allow(clippy::too_many_arguments)]
    async fn run_attempt(
        &self,
        attempt: u32,
        task_id: &TaskId,
        prompt: &str,
        output_file: &Path,
        timeout_secs: u64,
        options: &ExecOptions,
        pool_name: &str,
    ) -> Result<AttemptSuccess, ExecError> {
        // a. Next candidate model
        let model = self.selector.get_next().ok_or(ExecError::ModelUnavailable)?;
        self.emit(ExecEvent::ModelSelected {
            task_id: task_id.clone(),
            model: model.name.clone(),
            display_name: model.display_name.clone(),
        })
        .await;

        // b. Vendor invocation
        let strategy = self.strategies.get(&model.cli);
        let invocation = strategy.prepare(&model, prompt, &options.permissions);
        let display = invocation.display_name.clone();
        self.log_line(&format!(
            "task {task_id} attempt {attempt} using {display}"
        ));

        // c. Pre-spawn memory gate
        let pool_config = self.pools.get_pool_config(pool_name);
        if let Some(available) = memory::available_mb().await {
            let mut required = crate::env::min_free_memory_mb()
                .unwrap_or(self.config.min_free_memory_mb);
            if let Some(limit) = pool_config.as_ref().map(|p| p.memory_limit_mb) {
                required = required.max(limit);
            }
            if available < required {
                self.log_line(&format!(
                    "task {task_id} rejected: {available}MB free, {required}MB required"
                ));
                return Err(ExecError::ResourceExhausted {
                    available_mb: available,
                    required_mb: required,
                });
            }
        }

        // d. Spawn under the pool's priority hint
        let binary = (self.resolver)(&model.cli).ok_or_else(|| ExecError::CliNotFound {
            kind: model.cli.to_string(),
        })?;
        let spawn_options = SpawnOptions {
            env: invocation.env.clone(),
            cwd: None,
            nice: pool_config.map(|p| p.nice).unwrap_or(0),
        };
        let mut child = self
            .active_spawner()
            .await
            .spawn(&binary, &invocation.argv, spawn_options)
            .await
            .map_err(|e| ExecError::fatal(format!("{display} spawn failed: {e}")))?;

        if let Some(stdin) = &invocation.stdin_input {
            child
                .write_stdin(stdin.as_bytes())
                .await
                .map_err(|e| ExecError::fatal(format!("{display} stdin write failed: {e}")))?;
            child.close_stdin().await;
        }

        // e. Stream under the per-invocation timeout
        let timeout = model
            .timeout()
            .unwrap_or_else(|| Duration::from_secs(timeout_secs));
        let streamed = self.stream_child(&mut child, output_file, timeout).await?;

        // f. Classify the attempt
        let result = self
            .classify(&model.name, strategy, &display, &streamed, timeout)
            .map(|exit_code| AttemptSuccess {
                exit_code,
                model: model.name.clone(),
            });
        if let Err(error) = &result {
            self.emit(ExecEvent::AttemptFailed {
                task_id: task_id.clone(),
                model: model.name.clone(),
                attempt,
                error: error.to_string(),
            })
            .await;
            self.log_line(&format!("task {task_id} attempt {attempt} failed: {error}"));
        }
        result
    }

    fn classify(
        &self,
        model: &lw_core::ModelName,
        strategy: &lw_adapters::CliStrategy,
        display: &str,
        streamed: &StreamedOutput,
        timeout: Duration,
    ) -> Result<i32, ExecError> {
        if streamed.timed_out {
            self.selector.record_failure(model);
            return Err(ExecError::Timeout {
                display: display.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        if strategy.is_rate_limited(&streamed.output) {
            self.selector.record_failure(model);
            return Err(ExecError::RateLimit {
                display: display.to_string(),
                detail: "vendor rate-limit signal in output".to_string(),
            });
        }
        if strategy.is_quota_exhausted(&streamed.output) {
            self.selector.record_failure(model);
            if self.selector.using_fallback() {
                return Err(ExecError::fatal(format!(
                    "{display} quota exceeded on fallback pool"
                )));
            }
            self.selector.switch_to_fallback();
            return Err(ExecError::QuotaExceeded {
                display: display.to_string(),
            });
        }
        if strategy.detect_cache_corruption(&streamed.output) {
            self.selector.record_failure(model);
            let cleared = strategy.clear_cache();
            return Err(ExecError::CacheCorruption { cleared });
        }
        if streamed.exit_code != 0 {
            self.selector.record_failure(model);
            return Err(ExecError::fatal(format!(
                "{display} CLI exited with code {}",
                streamed.exit_code
            )));
        }
        self.selector.record_success(model);
        Ok(0)
    }

    /// Tee child output to the task's output file and the log sink,
    /// enforcing the timeout with SIGTERM-then-SIGKILL escalation.
    async fn stream_child(
        &self,
        child: &mut SpawnedChild,
        output_file: &Path,
        timeout: Duration,
    ) -> Result<StreamedOutput, ExecError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(output_file)
            .await
            .map_err(|e| ExecError::fatal(format!("output file open failed: {e}")))?;

        let mut collected: Vec<u8> = Vec::new();
        let mut line_buf = String::new();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut timed_out = false;

        loop {
            tokio::select! {
                chunk = child.next_chunk() => match chunk {
                    Some(chunk) => {
                        let bytes = chunk.bytes();
                        file.write_all(bytes)
                            .await
                            .map_err(|e| ExecError::fatal(format!("output file write failed: {e}")))?;
                        collected.extend_from_slice(bytes);
                        self.tee_lines(&mut line_buf, bytes);
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    timed_out = true;
                    self.kill_child(child).await;
                    break;
                }
                _ = self.cancel.cancelled() => {
                    self.kill_child(child).await;
                    return Err(ExecError::Canceled);
                }
            }
        }
        let _ = file.flush().await;
        if !line_buf.is_empty() {
            let _ = self.sink.write_line(&line_buf);
        }

        let exit_code = if timed_out {
            -1
        } else {
            // Streams may close while the child keeps running; the
            // deadline still applies to the exit itself.
            tokio::select! {
                result = child.wait() => {
                    result.map_err(|e| ExecError::fatal(format!("wait failed: {e}")))?
                }
                _ = tokio::time::sleep_until(deadline) => {
                    timed_out = true;
                    self.kill_child(child).await;
                    -1
                }
                _ = self.cancel.cancelled() => {
                    self.kill_child(child).await;
                    return Err(ExecError::Canceled);
                }
            }
        };

        Ok(StreamedOutput {
            output: String::from_utf8_lossy(&collected).into_owned(),
            exit_code,
            timed_out,
        })
    }

    /// SIGTERM, then SIGKILL once the grace period runs out
    async fn kill_child(&self, child: &mut SpawnedChild) {
        let grace = crate::env::kill_grace_ms()
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.kill_grace());
        let _ = child.kill(Signal::Term);
        tokio::select! {
            _ = child.wait() => {}
            _ = tokio::time::sleep(grace) => {
                let _ = child.kill(Signal::Kill);
                let _ = child.wait().await;
            }
        }
    }

    fn tee_lines(&self, buf: &mut String, bytes: &[u8]) {
        buf.push_str(&String::from_utf8_lossy(bytes));
        while let Some(pos) = buf.find('\n') {
            let line: String = buf.drain(..=pos).collect();
            let _ = self.sink.write_line(line.trim_end_matches(['\n', '\r']));
        }
    }

    async fn compose_prompt(&self, prompt: &str) -> String {
        let preamble = match &self.preamble_path {
            Some(path) => tokio::fs::read_to_string(path).await.unwrap_or_default(),
            None => String::new(),
        };
        if preamble.trim().is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", preamble.trim_end(), prompt)
        }
    }

    async fn report_failure(&self, task_id: &TaskId, error: &ExecError, output_file: &Path) {
        let Some(tx) = &self.failure_tx else {
            return;
        };
        let log_tail = tokio::fs::read(output_file)
            .await
            .map(|bytes| {
                let start = bytes.len().saturating_sub(LOG_TAIL_BYTES);
                String::from_utf8_lossy(&bytes[start..]).into_owned()
            })
            .unwrap_or_default();
        let _ = tx
            .send(TaskFailure {
                task_id: task_id.clone(),
                exit_reason: error.to_string(),
                log_tail,
            })
            .await;
    }

    /// Pseudoterminal spawner when its one-time probe passed, else pipe
    async fn active_spawner(&self) -> &dyn ProcessSpawner {
        if let Some(pty) = &self.pty_spawner {
            if self.mode_detector.detect(pty.as_ref()).await == SpawnMode::Pty {
                return pty.as_ref();
            }
        }
        self.spawner.as_ref()
    }

    async fn emit(&self, event: ExecEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    fn log_line(&self, line: &str) {
        tracing::info!("{line}");
        let _ = self.sink.write_line(&format!("[executor] {line}"));
    }
}

/// One attempt's captured output
struct StreamedOutput {
    output: String,
    exit_code: i32,
    timed_out: bool,
}

/// What a winning attempt reports back
struct AttemptSuccess {
    exit_code: i32,
    model: lw_core::ModelName,
}

async fn persist_prompt(output_file: &Path, prompt: &str) -> Result<(), ExecError> {
    let dir = output_file.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ExecError::fatal(format!("prompt dir create failed: {e}")))?;
    tokio::fs::write(dir.join("current-prompt.md"), prompt)
        .await
        .map_err(|e| ExecError::fatal(format!("prompt persist failed: {e}")))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
