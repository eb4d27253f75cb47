// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic process spawning
//!
//! The executor consumes the `ProcessSpawner` trait and never talks to
//! `tokio::process` directly. Output arrives as tagged byte chunks over a
//! channel; in pseudoterminal mode the stream is merged and only `Stdout`
//! chunks appear.

mod pipe;
mod probe;

pub use pipe::PipeSpawner;
pub use probe::{SpawnMode, SpawnModeDetector};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSpawner, ScriptedRun, SpawnCall};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

/// Errors from spawning or controlling a child
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("spawn failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("spawn mode unsupported: {0}")]
    Unsupported(String),
}

/// Signal escalation steps the executor uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

/// Options applied at spawn time
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Environment overrides layered on the parent environment
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// OS nice-like priority hint; 0 means inherit
    pub nice: i32,
}

/// One chunk of child output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(Vec<u8>),
    /// Only produced in pipe mode; pseudoterminal mode merges streams
    Stderr(Vec<u8>),
}

impl OutputChunk {
    pub fn bytes(&self) -> &[u8] {
        match self {
            OutputChunk::Stdout(b) | OutputChunk::Stderr(b) => b,
        }
    }
}

/// Control surface over a running child, implemented per spawner
#[async_trait]
pub trait ChildControl: Send {
    fn pid(&self) -> Option<u32>;
    /// Deliver a signal; `Kill` must be unconditional
    fn kill(&mut self, signal: Signal) -> std::io::Result<()>;
    /// Wait for exit; returns the exit code, or -1 when killed by signal
    async fn wait(&mut self) -> std::io::Result<i32>;
}

/// A spawned child: output channel, optional stdin, and control handle
pub struct SpawnedChild {
    output: mpsc::Receiver<OutputChunk>,
    stdin: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    control: Box<dyn ChildControl>,
}

impl SpawnedChild {
    pub fn new(
        output: mpsc::Receiver<OutputChunk>,
        stdin: Option<Box<dyn AsyncWrite + Send + Unpin>>,
        control: Box<dyn ChildControl>,
    ) -> Self {
        Self {
            output,
            stdin,
            control,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.control.pid()
    }

    /// Next output chunk; `None` once all streams are closed
    pub async fn next_chunk(&mut self) -> Option<OutputChunk> {
        self.output.recv().await
    }

    /// Write bytes to the child's stdin, if it has one
    pub async fn write_stdin(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;
        match self.stdin.as_mut() {
            Some(stdin) => {
                stdin.write_all(bytes).await?;
                stdin.flush().await
            }
            None => Ok(()),
        }
    }

    /// Close stdin so the child sees EOF
    pub async fn close_stdin(&mut self) {
        use tokio::io::AsyncWriteExt;
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }
    }

    pub fn kill(&mut self, signal: Signal) -> std::io::Result<()> {
        self.control.kill(signal)
    }

    pub async fn wait(&mut self) -> std::io::Result<i32> {
        self.control.wait().await
    }
}

impl std::fmt::Debug for SpawnedChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedChild")
            .field("pid", &self.pid())
            .field("has_stdin", &self.stdin.is_some())
            .finish()
    }
}

/// Launches children. Implementations: pipe (always available),
/// pseudoterminal (injected by the embedder when supported), fake (tests).
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(
        &self,
        command: &Path,
        argv: &[String],
        options: SpawnOptions,
    ) -> Result<SpawnedChild, SpawnError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
