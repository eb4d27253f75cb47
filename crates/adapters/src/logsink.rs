// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log sink with subscriber fan-out
//!
//! The executor tees child output through one sink per process; the healer
//! can either subscribe directly or tail the backing file with the log
//! watcher. Subscribers that fall behind lose lines rather than block the
//! writer.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

const SUBSCRIBER_CHANNEL_DEPTH: usize = 256;

/// Handle for dropping a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberToken(u64);

/// Shared append-only line sink over a backing file
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Mutex<SinkState>>,
    path: PathBuf,
}

struct SinkState {
    file: File,
    subscribers: Vec<(SubscriberToken, mpsc::Sender<String>)>,
    next_token: u64,
}

impl LogSink {
    /// Open (or create) the backing file in append mode
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(SinkState {
                file,
                subscribers: Vec::new(),
                next_token: 0,
            })),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line (newline added) and fan out to subscribers.
    ///
    /// Slow subscribers are skipped, closed ones are pruned.
    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut state = self.inner.lock();
        state.file.write_all(line.as_bytes())?;
        state.file.write_all(b"\n")?;
        state.file.flush()?;
        state
            .subscribers
            .retain(|(_, tx)| !matches!(tx.try_send(line.to_string()), Err(mpsc::error::TrySendError::Closed(_))));
        Ok(())
    }

    /// Register a subscriber for lines written after this call
    pub fn subscribe(&self) -> (SubscriberToken, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_DEPTH);
        let mut state = self.inner.lock();
        let token = SubscriberToken(state.next_token);
        state.next_token += 1;
        state.subscribers.push((token, tx));
        (token, rx)
    }

    pub fn unsubscribe(&self, token: SubscriberToken) {
        self.inner.lock().subscribers.retain(|(t, _)| *t != token);
    }
}

#[cfg(test)]
#[path = "logsink_tests.rs"]
mod tests;
