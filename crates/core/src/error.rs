// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed error taxonomy for task execution
//!
//! Errors are classified at the boundary where they occur; inside the
//! resilience runner the classification controls loop behavior. User-visible
//! strings carry the cli-kind display name and the failing condition.

use thiserror::Error;

/// Errors surfaced by one execution attempt
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecError {
    /// Vendor returned a rate-limit signal
    #[error("{display} rate limited: {detail}")]
    RateLimit { display: String, detail: String },

    /// Vendor quota or billing limit hit. The executor switches the selector
    /// to its fallback pool before throwing; a second quota hit while
    /// already on fallback arrives as `Fatal`.
    #[error("{display} quota exceeded")]
    QuotaExceeded { display: String },

    /// Per-invocation timer expired and the child was killed
    #[error("{display} timed out after {seconds}s")]
    Timeout { display: String, seconds: u64 },

    /// Opencode vendor cache corruption. `cleared` records whether the
    /// cache wipe succeeded; only a cleared cache is worth a retry.
    #[error("{}", if *.cleared {
        "opencode cache corruption detected and cleared"
    } else {
        "opencode cache corruption detected, cache clear failed"
    })]
    CacheCorruption { cleared: bool },

    /// Pre-spawn memory gate failed or the OS signalled out-of-memory
    #[error("insufficient memory: {available_mb}MB available, {required_mb}MB required")]
    ResourceExhausted { available_mb: u64, required_mb: u64 },

    /// The selector has no candidate left in either pool
    #[error("no models left to try")]
    ModelUnavailable,

    /// No binary path resolved for the chosen cli-kind
    #[error("cli not found for {kind}")]
    CliNotFound { kind: String },

    /// A caller-listed retryable condition
    #[error("{message}")]
    Transient { message: String },

    /// Execution was canceled by the caller
    #[error("execution canceled")]
    Canceled,

    /// Any other non-zero exit or uncategorized failure
    #[error("{message}")]
    Fatal { message: String },
}

/// How the resilience runner reacts to a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Sleep the configured rate-limit wait, then retry
    RateLimit,
    /// Retry under the backoff schedule
    Transient,
    /// Return failure immediately
    Fatal,
}

impl ExecError {
    pub fn fatal(message: impl Into<String>) -> Self {
        ExecError::Fatal {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        ExecError::Transient {
            message: message.into(),
        }
    }

    /// Classify for the retry loop. `retryable` is the caller-listed set of
    /// message fragments treated as transient wherever they appear.
    pub fn retry_class(&self, retryable: &[String]) -> RetryClass {
        match self {
            ExecError::RateLimit { .. } => RetryClass::RateLimit,
            ExecError::Timeout { .. }
            | ExecError::Transient { .. }
            | ExecError::QuotaExceeded { .. }
            | ExecError::CacheCorruption { cleared: true } => RetryClass::Transient,
            ExecError::CacheCorruption { cleared: false }
            | ExecError::ResourceExhausted { .. }
            | ExecError::ModelUnavailable
            | ExecError::CliNotFound { .. }
            | ExecError::Canceled => RetryClass::Fatal,
            ExecError::Fatal { message } => {
                let lower = message.to_lowercase();
                if retryable.iter().any(|frag| lower.contains(&frag.to_lowercase())) {
                    RetryClass::Transient
                } else {
                    RetryClass::Fatal
                }
            }
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ExecError::RateLimit { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
