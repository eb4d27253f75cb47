// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounced log-file tailer
//!
//! Reports only lines appended after `start()`; existing content is
//! skipped by recording the starting size. Filesystem change events are
//! debounced before reading; a polling tick covers platforms where the
//! notify backend misses events. Truncation resets the read offset to
//! zero and drops any buffered partial line.

use lw_core::Clock;
use notify::{RecursiveMode, Watcher as _};
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const LINE_CHANNEL_DEPTH: usize = 256;

/// Watcher tuning
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub path: PathBuf,
    /// Quiet period after a change event before reading
    pub debounce: Duration,
    /// Fallback poll interval
    pub poll_interval: Duration,
}

impl WatcherConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: crate::env::watcher_debounce(),
            poll_interval: crate::env::watcher_poll(),
        }
    }
}

/// One newly appended, newline-terminated line
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub line: String,
    pub timestamp_ms: u64,
}

/// Handle to a running watcher task
pub struct LogWatcher {
    shutdown: Option<oneshot::Sender<()>>,
}

impl LogWatcher {
    /// Start tailing. Lines appended after this call arrive on the
    /// returned receiver in file-offset order.
    pub fn start<C: Clock>(config: WatcherConfig, clock: C) -> (Self, mpsc::Receiver<LogLine>) {
        let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_DEPTH);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(watch_loop(config, clock, line_tx, shutdown_rx));
        (
            Self {
                shutdown: Some(shutdown_tx),
            },
            line_rx,
        )
    }

    /// Stop the watcher task. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn watch_loop<C: Clock>(
    config: WatcherConfig,
    clock: C,
    line_tx: mpsc::Sender<LogLine>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut tail = Tail::starting_at_current_size(&config.path);

    // Filesystem events; best-effort, polling still runs without them
    let (event_tx, mut event_rx) = mpsc::channel::<()>(32);
    let _watcher_guard = create_file_watcher(&config, event_tx);
    if _watcher_guard.is_none() {
        tracing::warn!(path = %config.path.display(), "file watcher unavailable, relying on polling");
    }

    let mut debounce_deadline: Option<tokio::time::Instant> = None;
    loop {
        let debounce_sleep = async {
            match debounce_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            Some(()) = event_rx.recv() => {
                debounce_deadline =
                    Some(tokio::time::Instant::now() + config.debounce);
            }
            () = debounce_sleep => {
                debounce_deadline = None;
                flush(&mut tail, &clock, &line_tx).await;
            }
            () = tokio::time::sleep(config.poll_interval) => {
                flush(&mut tail, &clock, &line_tx).await;
            }
            _ = &mut shutdown_rx => {
                tracing::debug!(path = %config.path.display(), "log watcher shutdown");
                break;
            }
        }
    }
}

async fn flush<C: Clock>(tail: &mut Tail, clock: &C, line_tx: &mpsc::Sender<LogLine>) {
    for line in tail.read_new_lines() {
        let event = LogLine {
            line,
            timestamp_ms: clock.epoch_ms(),
        };
        if line_tx.send(event).await.is_err() {
            return; // subscriber gone; the loop ends on shutdown
        }
    }
}

fn create_file_watcher(
    config: &WatcherConfig,
    tx: mpsc::Sender<()>,
) -> Option<notify::RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.try_send(());
        }
    })
    .ok()?;
    // Watch the parent so creation of a missing log file is seen too
    let target = config
        .path
        .parent()
        .filter(|p| p.exists())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| config.path.clone());
    watcher.watch(&target, RecursiveMode::NonRecursive).ok()?;
    Some(watcher)
}

/// Offset-tracking incremental reader
struct Tail {
    path: PathBuf,
    last_size: u64,
    partial: String,
}

impl Tail {
    fn starting_at_current_size(path: &std::path::Path) -> Self {
        let last_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self {
            path: path.to_path_buf(),
            last_size,
            partial: String::new(),
        }
    }

    /// Read appended bytes and return the complete lines among them.
    fn read_new_lines(&mut self) -> Vec<String> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Vec::new(),
        };
        if size < self.last_size {
            // Truncated: restart from the top and drop the partial line
            self.last_size = 0;
            self.partial.clear();
        }
        if size == self.last_size {
            return Vec::new();
        }

        let Ok(mut file) = std::fs::File::open(&self.path) else {
            return Vec::new();
        };
        if file.seek(SeekFrom::Start(self.last_size)).is_err() {
            return Vec::new();
        }
        let mut buf = Vec::with_capacity((size - self.last_size) as usize);
        if file
            .by_ref()
            .take(size - self.last_size)
            .read_to_end(&mut buf)
            .is_err()
        {
            return Vec::new();
        }
        self.last_size = size;

        self.partial.push_str(&String::from_utf8_lossy(&buf));
        let mut lines = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
