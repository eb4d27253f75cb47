// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Corrective actions and their execution
//!
//! Actions mutate the filesystem (or the task backend) without the
//! executor's knowledge. `OpenGlobalBreaker` is special-cased by the
//! healer itself since it targets the healer's own gate.

use lw_adapters::StrategyRegistry;
use lw_core::{CliKind, TaskBackend, TaskId};
use std::path::PathBuf;
use std::sync::Arc;

/// What a matched pattern (or recovery analysis) wants done
#[derive(Debug, Clone, PartialEq)]
pub enum HealAction {
    /// Scaffold a spec file the logs say is missing
    CreateMissingSpec { path: PathBuf },
    /// Wipe the opencode vendor cache
    ClearVendorCache,
    /// Trip the healer's own gate; cools every action down
    OpenGlobalBreaker { reason: String },
    /// Append recovery hints to the task's spec
    EnhanceTask { task_id: TaskId, hint: String },
}

impl HealAction {
    pub fn name(&self) -> &'static str {
        match self {
            HealAction::CreateMissingSpec { .. } => "create-missing-spec",
            HealAction::ClearVendorCache => "clear-vendor-cache",
            HealAction::OpenGlobalBreaker { .. } => "open-global-breaker",
            HealAction::EnhanceTask { .. } => "enhance-task",
        }
    }
}

/// Executes actions against the filesystem and task backend
pub struct ActionRunner {
    specs_dir: PathBuf,
    strategies: StrategyRegistry,
    backend: Option<Arc<dyn TaskBackend>>,
}

impl ActionRunner {
    pub fn new(specs_dir: impl Into<PathBuf>, strategies: StrategyRegistry) -> Self {
        Self {
            specs_dir: specs_dir.into(),
            strategies,
            backend: None,
        }
    }

    /// Attach the task backend so enhance-task can write spec hints
    pub fn with_backend(mut self, backend: Arc<dyn TaskBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Run one action. Returns `Ok(())` on success; the error string is
    /// recorded against the pattern's wisdom entry.
    pub async fn run(&self, action: &HealAction) -> Result<(), String> {
        match action {
            HealAction::CreateMissingSpec { path } => self.create_missing_spec(path).await,
            HealAction::ClearVendorCache => {
                if self.strategies.get(&CliKind::Opencode).clear_cache() {
                    Ok(())
                } else {
                    Err("vendor cache clear failed".to_string())
                }
            }
            // The healer intercepts this variant before reaching here
            HealAction::OpenGlobalBreaker { .. } => Ok(()),
            HealAction::EnhanceTask { task_id, hint } => {
                let backend = self
                    .backend
                    .as_ref()
                    .ok_or_else(|| "no task backend attached".to_string())?;
                backend
                    .append_spec_hint(task_id, hint)
                    .await
                    .map_err(|e| e.to_string())
            }
        }
    }

    async fn create_missing_spec(&self, path: &std::path::Path) -> Result<(), String> {
        let target = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.specs_dir.join(path)
        };
        if target.exists() {
            return Ok(()); // someone beat us to it
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("spec dir create failed: {e}"))?;
        }
        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "task".to_string());
        let scaffold = format!(
            "# {stem}\n\n> Scaffolded automatically; the original spec file was missing.\n\n## Goal\n\nTBD\n\n## Acceptance\n\nTBD\n"
        );
        tokio::fs::write(&target, scaffold)
            .await
            .map_err(|e| format!("spec write failed: {e}"))?;
        tracing::info!(path = %target.display(), "scaffolded missing spec");
        Ok(())
    }
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
