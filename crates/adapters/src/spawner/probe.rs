// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot spawn-mode detection
//!
//! Pseudoterminal support varies by platform and sandbox. The detector
//! probes the candidate spawner with one short-lived child, caches the
//! verdict for the process lifetime, and never retries.

use super::{ProcessSpawner, SpawnOptions};
use std::path::PathBuf;
use tokio::sync::OnceCell;

/// How children are spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    Pty,
    Pipe,
}

/// Caches whether the injected pseudoterminal spawner actually works here.
pub struct SpawnModeDetector {
    probe_command: PathBuf,
    verdict: OnceCell<SpawnMode>,
}

impl SpawnModeDetector {
    pub fn new() -> Self {
        Self::with_probe_command("true")
    }

    /// Use a custom probe binary (tests point this at a fake)
    pub fn with_probe_command(command: impl Into<PathBuf>) -> Self {
        Self {
            probe_command: command.into(),
            verdict: OnceCell::new(),
        }
    }

    /// Resolve the spawn mode. The first call probes `candidate` by
    /// spawning and reaping one child under a timeout; every later call
    /// returns the cached verdict without touching the spawner again.
    pub async fn detect(&self, candidate: &dyn ProcessSpawner) -> SpawnMode {
        *self
            .verdict
            .get_or_init(|| async {
                let probe = async {
                    let mut child = candidate
                        .spawn(&self.probe_command, &[], SpawnOptions::default())
                        .await
                        .ok()?;
                    child.wait().await.ok()
                };
                match tokio::time::timeout(crate::env::probe_timeout(), probe).await {
                    Ok(Some(0)) => SpawnMode::Pty,
                    Ok(exit) => {
                        tracing::debug!(?exit, "pty probe child failed, using pipe mode");
                        SpawnMode::Pipe
                    }
                    Err(_) => {
                        tracing::debug!("pty probe timed out, using pipe mode");
                        SpawnMode::Pipe
                    }
                }
            })
            .await
    }

    /// The cached verdict, if the probe has run
    pub fn cached(&self) -> Option<SpawnMode> {
        self.verdict.get().copied()
    }
}

impl Default for SpawnModeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
