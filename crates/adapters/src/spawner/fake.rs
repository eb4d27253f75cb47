// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted spawner for tests

use super::{ChildControl, OutputChunk, ProcessSpawner, Signal, SpawnError, SpawnOptions, SpawnedChild};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// One pre-scripted child run
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// How long the child "runs" before exiting; `None` exits immediately
    pub run_for: Option<Duration>,
}

impl ScriptedRun {
    /// A child that prints `stdout` and exits 0
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            run_for: None,
        }
    }

    /// A child that prints `stdout` and exits with `code`
    pub fn exit(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: code,
            run_for: None,
        }
    }

    /// A child that hangs for `duration` before exiting 0
    pub fn hang_for(duration: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            run_for: Some(duration),
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn with_run_for(mut self, duration: Duration) -> Self {
        self.run_for = Some(duration);
        self
    }
}

/// A recorded spawn, with everything written to the child's stdin
#[derive(Debug, Clone)]
pub struct SpawnCall {
    pub command: PathBuf,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub nice: i32,
    stdin: Arc<Mutex<Vec<u8>>>,
}

impl SpawnCall {
    pub fn stdin_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stdin.lock()).into_owned()
    }
}

/// Spawner that replays a script of runs and records every call
#[derive(Clone, Default)]
pub struct FakeSpawner {
    script: Arc<Mutex<VecDeque<ScriptedRun>>>,
    calls: Arc<Mutex<Vec<SpawnCall>>>,
    kills: Arc<Mutex<Vec<Signal>>>,
    refuse_spawn: Arc<Mutex<bool>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A spawner whose every spawn fails, for probe fallback tests
    pub fn refusing() -> Self {
        let spawner = Self::default();
        *spawner.refuse_spawn.lock() = true;
        spawner
    }

    pub fn push(&self, run: ScriptedRun) {
        self.script.lock().push_back(run);
    }

    pub fn calls(&self) -> Vec<SpawnCall> {
        self.calls.lock().clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Signals delivered to scripted children, in order
    pub fn kill_signals(&self) -> Vec<Signal> {
        self.kills.lock().clone()
    }
}

#[async_trait]
impl ProcessSpawner for FakeSpawner {
    async fn spawn(
        &self,
        command: &Path,
        argv: &[String],
        options: SpawnOptions,
    ) -> Result<SpawnedChild, SpawnError> {
        if *self.refuse_spawn.lock() {
            return Err(SpawnError::Unsupported("refused by script".to_string()));
        }
        let run = self.script.lock().pop_front().unwrap_or_else(|| {
            ScriptedRun::ok("")
        });

        let stdin_buf = Arc::new(Mutex::new(Vec::new()));
        self.calls.lock().push(SpawnCall {
            command: command.to_path_buf(),
            argv: argv.to_vec(),
            env: options.env.clone(),
            nice: options.nice,
            stdin: Arc::clone(&stdin_buf),
        });

        let (tx, rx) = mpsc::channel(4);
        if !run.stdout.is_empty() {
            let _ = tx.send(OutputChunk::Stdout(run.stdout.clone().into_bytes())).await;
        }
        if !run.stderr.is_empty() {
            let _ = tx.send(OutputChunk::Stderr(run.stderr.clone().into_bytes())).await;
        }
        drop(tx);

        let control = FakeChildControl {
            exit_code: run.exit_code,
            run_for: run.run_for,
            kill_notify: Arc::new(Notify::new()),
            kills: Arc::clone(&self.kills),
        };

        Ok(SpawnedChild::new(
            rx,
            Some(Box::new(SharedBufWriter(stdin_buf))),
            Box::new(control),
        ))
    }
}

struct FakeChildControl {
    exit_code: i32,
    run_for: Option<Duration>,
    kill_notify: Arc<Notify>,
    kills: Arc<Mutex<Vec<Signal>>>,
}

#[async_trait]
impl ChildControl for FakeChildControl {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn kill(&mut self, signal: Signal) -> std::io::Result<()> {
        self.kills.lock().push(signal);
        self.kill_notify.notify_one();
        Ok(())
    }

    async fn wait(&mut self) -> std::io::Result<i32> {
        match self.run_for {
            None => Ok(self.exit_code),
            Some(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => Ok(self.exit_code),
                    _ = self.kill_notify.notified() => Ok(-1),
                }
            }
        }
    }
}

/// AsyncWrite sink into a shared buffer, so tests can inspect stdin
struct SharedBufWriter(Arc<Mutex<Vec<u8>>>);

impl tokio::io::AsyncWrite for SharedBufWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.0.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
