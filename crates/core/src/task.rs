// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal task view and the pluggable task backend
//!
//! Task records are owned by an external backend; the core borrows them
//! read-only for the duration of one execution.

use crate::id::TaskId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Priority class, used to route a task to a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
    Background,
}

impl Priority {
    /// Name of the pool this priority class maps to
    pub fn pool_name(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Background => "background",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.pool_name())
    }
}

/// Retry bookkeeping carried on a task record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryMeta {
    pub attempts: u32,
    pub max_attempts: u32,
}

impl RetryMeta {
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// The slice of a task record the execution core reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub priority: Priority,
    /// Optional feature tag; routes to a pool of the same name when one exists
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryMeta>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            priority: Priority::default(),
            feature: None,
            retry: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }
}

/// Errors from the task backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("backend io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Other(String),
}

/// Persistence of task records, supplied by the surrounding product.
///
/// The healer's enhance-task path writes recovery hints back through
/// `append_spec_hint`; everything else is read-mostly.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Pop the next runnable task, if any
    async fn next_task(&self) -> Result<Option<Task>, BackendError>;

    /// Mark a task complete
    async fn complete(&self, id: &TaskId) -> Result<(), BackendError>;

    /// Mark a task failed with a reason
    async fn fail(&self, id: &TaskId, reason: &str) -> Result<(), BackendError>;

    /// Path of the task's spec file, when the backend stores specs on disk
    async fn spec_path(&self, id: &TaskId) -> Option<PathBuf>;

    /// Append a recovery hint to the task's spec file
    async fn append_spec_hint(&self, id: &TaskId, hint: &str) -> Result<(), BackendError>;
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, FakeBackend};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// A recorded backend call, for test assertions
    #[derive(Debug, Clone, PartialEq)]
    pub enum BackendCall {
        Complete(TaskId),
        Fail(TaskId, String),
        AppendSpecHint(TaskId, String),
    }

    /// In-memory backend that records every mutation
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        queue: Arc<Mutex<VecDeque<Task>>>,
        calls: Arc<Mutex<Vec<BackendCall>>>,
        spec_dir: Arc<Mutex<Option<PathBuf>>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, task: Task) {
            self.queue.lock().push_back(task);
        }

        /// Direct specs at `dir/<task-id>.md` for enhance-task tests
        pub fn with_spec_dir(self, dir: impl Into<PathBuf>) -> Self {
            *self.spec_dir.lock() = Some(dir.into());
            self
        }

        pub fn calls(&self) -> Vec<BackendCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl TaskBackend for FakeBackend {
        async fn next_task(&self) -> Result<Option<Task>, BackendError> {
            Ok(self.queue.lock().pop_front())
        }

        async fn complete(&self, id: &TaskId) -> Result<(), BackendError> {
            self.calls.lock().push(BackendCall::Complete(id.clone()));
            Ok(())
        }

        async fn fail(&self, id: &TaskId, reason: &str) -> Result<(), BackendError> {
            self.calls
                .lock()
                .push(BackendCall::Fail(id.clone(), reason.to_string()));
            Ok(())
        }

        async fn spec_path(&self, id: &TaskId) -> Option<PathBuf> {
            self.spec_dir
                .lock()
                .as_ref()
                .map(|dir| dir.join(format!("{}.md", id)))
        }

        async fn append_spec_hint(&self, id: &TaskId, hint: &str) -> Result<(), BackendError> {
            self.calls
                .lock()
                .push(BackendCall::AppendSpecHint(id.clone(), hint.to_string()));
            if let Some(path) = self.spec_path(id).await {
                let mut content = std::fs::read_to_string(&path).unwrap_or_default();
                content.push_str(hint);
                std::fs::write(&path, content)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
