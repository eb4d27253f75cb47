// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events emitted by the executor
//!
//! The plugin hook bus lives outside the core; these events are the surface
//! it consumes. The healer's task-failure feed rides a separate channel so
//! log-tail payloads never reach plugin listeners.

use crate::id::{ModelName, PoolName, TaskId};
use serde::{Deserialize, Serialize};

/// One lifecycle event for an in-flight execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecEvent {
    TaskStarted {
        task_id: TaskId,
        pool: PoolName,
    },
    ModelSelected {
        task_id: TaskId,
        model: ModelName,
        display_name: String,
    },
    AttemptFailed {
        task_id: TaskId,
        model: ModelName,
        attempt: u32,
        error: String,
    },
    TaskCompleted {
        task_id: TaskId,
        model: ModelName,
        exit_code: i32,
    },
    TaskFailed {
        task_id: TaskId,
        error: String,
    },
}

/// Failure report fed to the healer's recovery path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub exit_reason: String,
    /// Tail of the execution log at failure time
    pub log_tail: String,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
