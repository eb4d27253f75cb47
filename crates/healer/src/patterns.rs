// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered pattern table over log lines
//!
//! Matching is first-wins, so the table keeps specific signatures ahead
//! of general ones (the opencode ENOENT entry must run before the generic
//! missing-dependency entry, which also matches ENOENT).

use crate::actions::HealAction;
use lw_core::TaskId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How loudly the monitor records a match; never terminates anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    High,
    Critical,
}

/// One recognized line
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub name: &'static str,
    pub severity: Severity,
    pub line: String,
    /// First capture group, when the pattern has one
    pub capture: Option<String>,
}

type ActionFactory = fn(&PatternMatch) -> Option<HealAction>;

struct PatternDef {
    name: &'static str,
    regex: Regex,
    severity: Severity,
    action: Option<ActionFactory>,
}

/// The closed, ordered pattern list
pub struct PatternEngine {
    patterns: Vec<PatternDef>,
}

impl PatternEngine {
    /// The standard table. Ordering is load-bearing.
    pub fn standard() -> Result<Self, regex::Error> {
        let defs: Vec<(&'static str, &str, Severity, Option<ActionFactory>)> = vec![
            (
                "missing-spec",
                r"(?i)spec (?:file )?not found[:\s]+(\S+)",
                Severity::High,
                Some(create_missing_spec as ActionFactory),
            ),
            (
                "opencode-cache-corruption",
                r"ENOENT[^\n]*opencode",
                Severity::High,
                Some(clear_vendor_cache as ActionFactory),
            ),
            (
                "rate-limit",
                r"(?i)rate.?limit|too many requests|\b429\b",
                Severity::Warn,
                None,
            ),
            (
                "required-env-var",
                r"(?i)(?:environment variable|env var) (\w+) (?:is )?(?:not set|missing|required|unset)",
                Severity::Error,
                None,
            ),
            (
                "repeated-task-failure",
                r"(?i)task (\S+) (?:has )?failed (\d+) times",
                Severity::Critical,
                Some(open_global_breaker as ActionFactory),
            ),
            (
                "execution-timeout",
                r"(?i)timed out after \d+s",
                Severity::Warn,
                None,
            ),
            (
                "early-exit-clarification",
                r"(?i)needs? clarification|waiting for (?:user )?input|exited early",
                Severity::Warn,
                None,
            ),
            (
                "permission-denied",
                r"(?i)permission denied|\bEACCES\b",
                Severity::Error,
                None,
            ),
            (
                "missing-dependency",
                r"(?i)command not found|no such file or directory|cannot find module|\bENOENT\b",
                Severity::Error,
                None,
            ),
            (
                "network-error",
                r"(?i)network (?:error|unreachable)|connection refused|\bECONNREFUSED\b|\bETIMEDOUT\b",
                Severity::Error,
                None,
            ),
            (
                "plugin-error",
                r"(?i)plugin [\w-]+ (?:failed|errored|crashed)",
                Severity::Warn,
                None,
            ),
            (
                "circuit-breaker-tripped",
                r"(?i)circuit breaker opened|breaker tripped",
                Severity::High,
                Some(open_global_breaker as ActionFactory),
            ),
        ];

        let mut patterns = Vec::with_capacity(defs.len());
        for (name, pattern, severity, action) in defs {
            patterns.push(PatternDef {
                name,
                regex: Regex::new(pattern)?,
                severity,
                action,
            });
        }
        Ok(Self { patterns })
    }

    /// First matching pattern, or `None`
    pub fn match_line(&self, line: &str) -> Option<PatternMatch> {
        for def in &self.patterns {
            if let Some(captures) = def.regex.captures(line) {
                return Some(PatternMatch {
                    name: def.name,
                    severity: def.severity,
                    line: line.to_string(),
                    capture: captures.get(1).map(|m| m.as_str().to_string()),
                });
            }
        }
        None
    }

    /// The action this match triggers, when its pattern defines one
    pub fn action_for(&self, matched: &PatternMatch) -> Option<HealAction> {
        self.patterns
            .iter()
            .find(|def| def.name == matched.name)
            .and_then(|def| def.action)
            .and_then(|factory| factory(matched))
    }
}

fn create_missing_spec(matched: &PatternMatch) -> Option<HealAction> {
    matched.capture.as_ref().map(|path| HealAction::CreateMissingSpec {
        path: PathBuf::from(path),
    })
}

fn clear_vendor_cache(_matched: &PatternMatch) -> Option<HealAction> {
    Some(HealAction::ClearVendorCache)
}

fn open_global_breaker(matched: &PatternMatch) -> Option<HealAction> {
    Some(HealAction::OpenGlobalBreaker {
        reason: matched.line.clone(),
    })
}

/// Task-failure recovery hint, built from the log tail
pub fn enhance_task_action(task_id: &TaskId, exit_reason: &str, log_tail: &str) -> HealAction {
    let excerpt: Vec<&str> = log_tail.lines().rev().take(10).collect();
    let excerpt: Vec<&str> = excerpt.into_iter().rev().collect();
    let hint = format!(
        "\n## Recovery hints\n\nThe previous run failed: {exit_reason}\n\nLog tail:\n```\n{}\n```\n",
        excerpt.join("\n")
    );
    HealAction::EnhanceTask {
        task_id: task_id.clone(),
        hint,
    }
}

#[cfg(test)]
#[path = "patterns_tests.rs"]
mod tests;
