// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model configuration and cli-kind tags

use crate::id::ModelName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cost weight assumed for models that do not declare one
pub const DEFAULT_COST_WEIGHT: u32 = 50;

/// Tag identifying which external AI command a model runs on.
///
/// The closed set covers the vendors the strategy table knows; `Custom`
/// carries user-registered kinds through config without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CliKind {
    Claude,
    Opencode,
    Gemini,
    Droid,
    Crush,
    Kimi,
    Kilocode,
    Custom(String),
}

impl CliKind {
    pub fn as_str(&self) -> &str {
        match self {
            CliKind::Claude => "claude",
            CliKind::Opencode => "opencode",
            CliKind::Gemini => "gemini",
            CliKind::Droid => "droid",
            CliKind::Crush => "crush",
            CliKind::Kimi => "kimi",
            CliKind::Kilocode => "kilocode",
            CliKind::Custom(name) => name,
        }
    }

    /// Default binary name looked up on PATH
    pub fn binary_name(&self) -> &str {
        self.as_str()
    }

    /// Environment variable overriding the binary path for this kind,
    /// e.g. `LOOPWORK_CLAUDE_PATH`
    pub fn path_env_var(&self) -> String {
        format!("LOOPWORK_{}_PATH", self.as_str().to_uppercase())
    }

    pub fn known_kinds() -> [CliKind; 7] {
        [
            CliKind::Claude,
            CliKind::Opencode,
            CliKind::Gemini,
            CliKind::Droid,
            CliKind::Crush,
            CliKind::Kimi,
            CliKind::Kilocode,
        ]
    }
}

impl From<&str> for CliKind {
    fn from(s: &str) -> Self {
        match s {
            "claude" => CliKind::Claude,
            "opencode" => CliKind::Opencode,
            "gemini" => CliKind::Gemini,
            "droid" => CliKind::Droid,
            "crush" => CliKind::Crush,
            "kimi" => CliKind::Kimi,
            "kilocode" => CliKind::Kilocode,
            other => CliKind::Custom(other.to_string()),
        }
    }
}

impl std::str::FromStr for CliKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CliKind::from(s))
    }
}

impl std::fmt::Display for CliKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CliKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CliKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CliKind::from(s.as_str()))
    }
}

/// How the selector picks the next candidate from a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    #[default]
    RoundRobin,
    Priority,
    CostAware,
    Random,
}

/// One model entry in the primary or fallback pool. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Logical name, unique across both pools
    pub name: ModelName,
    /// Human display name used in user-visible error strings
    #[serde(default)]
    pub display_name: String,
    /// Which external CLI runs this model
    pub cli: CliKind,
    /// Concrete model identifier passed to the CLI
    pub model_id: String,
    /// Extra argv entries appended after the kind's template
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Environment overrides applied at spawn
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Per-call timeout in seconds; the caller's timeout applies when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Cost weight for the cost-aware strategy; lower is cheaper
    #[serde(default)]
    pub cost_weight: Option<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ModelConfig {
    pub fn new(name: impl Into<ModelName>, cli: CliKind, model_id: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.to_string(),
            name,
            cli,
            model_id: model_id.into(),
            extra_args: Vec::new(),
            env: Vec::new(),
            timeout_secs: None,
            cost_weight: None,
            enabled: true,
        }
    }

    pub fn with_cost_weight(mut self, weight: u32) -> Self {
        self.cost_weight = Some(weight);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Cost weight with the default applied for absent entries
    pub fn effective_cost(&self) -> u32 {
        self.cost_weight.unwrap_or(DEFAULT_COST_WEIGHT)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
