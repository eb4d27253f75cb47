// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-vendor CLI strategies
//!
//! A strategy is the pure adapter between a model config and a concrete
//! invocation: argv template, environment mutations, stdin routing, and the
//! vendor's rate-limit / quota signatures. Only the opencode strategy has
//! side effects (vendor cache clearing).

use lw_core::{CliKind, ModelConfig};
use regex::RegexSet;
use std::collections::HashMap;
use std::path::PathBuf;

/// Default opencode permission grant applied when the caller sets none
const OPENCODE_PERMISSION_VAR: &str = "OPENCODE_PERMISSION";
const OPENCODE_PERMISSION_ALLOW_ALL: &str = r#"{"*":"allow"}"#;

/// Everything needed to launch one CLI invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    /// When present, written to the child's stdin and then closed
    pub stdin_input: Option<String>,
    pub display_name: String,
}

/// The adapter for one cli-kind
#[derive(Debug, Clone)]
pub struct CliStrategy {
    kind: CliKind,
    rate_limit: RegexSet,
    quota: RegexSet,
    cache_corruption: RegexSet,
}

impl CliStrategy {
    fn build(kind: CliKind) -> Result<Self, regex::Error> {
        let rate_limit: &[&str] = match kind {
            CliKind::Claude => &[
                r"(?i)rate.*limit",
                r"(?i)too many requests",
                r"429",
                r"(?i)message.*limit",
            ],
            CliKind::Gemini => &[
                r"(?i)rate.*limit",
                r"429",
                r"RESOURCE_EXHAUSTED",
                r"(?i)Free Tier Rate Limit Exceeded",
            ],
            _ => &[r"(?i)rate.*limit", r"(?i)too many requests", r"429"],
        };
        let quota: &[&str] = match kind {
            CliKind::Claude | CliKind::Kimi => &[
                r"(?i)quota.*exceed",
                r"(?i)billing.*limit",
                r"(?i)token.*limit",
            ],
            _ => &[r"(?i)quota.*exceed", r"(?i)billing.*limit"],
        };
        let cache_corruption: &[&str] = if kind == CliKind::Opencode {
            &[
                r"ENOENT[^\n]*opencode",
                r"(?i)cannot find module[^\n]*opencode",
                r"(?i)opencode[^\n]*cache[^\n]*corrupt",
            ]
        } else {
            &[]
        };
        Ok(Self {
            kind,
            rate_limit: RegexSet::new(rate_limit)?,
            quota: RegexSet::new(quota)?,
            cache_corruption: RegexSet::new(cache_corruption)?,
        })
    }

    pub fn kind(&self) -> &CliKind {
        &self.kind
    }

    /// Assemble argv, env, and stdin routing for one invocation.
    ///
    /// `permissions` are per-invocation env entries; they layer over the
    /// model's own overrides (later entries win at spawn).
    pub fn prepare(
        &self,
        config: &ModelConfig,
        prompt: &str,
        permissions: &[(String, String)],
    ) -> Invocation {
        let mut env: Vec<(String, String)> = config.env.clone();
        env.extend(permissions.iter().cloned());

        let (mut argv, stdin_input) = match &self.kind {
            CliKind::Claude => (Vec::new(), Some(prompt.to_string())),
            CliKind::Opencode => {
                if !env.iter().any(|(k, _)| k == OPENCODE_PERMISSION_VAR) {
                    env.push((
                        OPENCODE_PERMISSION_VAR.to_string(),
                        OPENCODE_PERMISSION_ALLOW_ALL.to_string(),
                    ));
                }
                (
                    vec![
                        "run".to_string(),
                        "--model".to_string(),
                        config.model_id.clone(),
                        prompt.to_string(),
                    ],
                    None,
                )
            }
            CliKind::Gemini => (
                vec!["--model".to_string(), config.model_id.clone()],
                Some(prompt.to_string()),
            ),
            CliKind::Droid => (vec!["exec".to_string(), prompt.to_string()], None),
            CliKind::Crush => (
                vec![
                    "run".to_string(),
                    "-m".to_string(),
                    config.model_id.clone(),
                    prompt.to_string(),
                ],
                None,
            ),
            CliKind::Kimi => {
                // The kimi CLI reads its key from the vendor variable; copy
                // it over from the permissions map when the caller set one.
                if let Some((_, key)) = permissions.iter().find(|(k, _)| k == "KIMI_API_KEY") {
                    if !env.iter().any(|(k, _)| k == "MOONSHOT_API_KEY") {
                        env.push(("MOONSHOT_API_KEY".to_string(), key.clone()));
                    }
                }
                (Vec::new(), Some(prompt.to_string()))
            }
            CliKind::Kilocode | CliKind::Custom(_) => (Vec::new(), Some(prompt.to_string())),
        };
        argv.extend(config.extra_args.iter().cloned());

        let display_name = if config.display_name.is_empty() {
            config.name.to_string()
        } else {
            config.display_name.clone()
        };

        Invocation {
            argv,
            env,
            stdin_input,
            display_name,
        }
    }

    pub fn is_rate_limited(&self, output: &str) -> bool {
        self.rate_limit.is_match(output)
    }

    pub fn is_quota_exhausted(&self, output: &str) -> bool {
        self.quota.is_match(output)
    }

    /// Whether the output shows the opencode vendor cache is corrupted.
    /// Always false for other kinds.
    pub fn detect_cache_corruption(&self, output: &str) -> bool {
        !self.cache_corruption.is_empty() && self.cache_corruption.is_match(output)
    }

    /// Wipe the opencode vendor cache. Returns true when every candidate
    /// directory was removed (or did not exist). No-op true for other kinds.
    pub fn clear_cache(&self) -> bool {
        if self.kind != CliKind::Opencode {
            return true;
        }
        for dir in opencode_cache_dirs() {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&dir) {
                    tracing::warn!(dir = %dir.display(), error = %e, "opencode cache clear failed");
                    return false;
                }
                tracing::info!(dir = %dir.display(), "cleared opencode cache");
            }
        }
        true
    }
}

/// Candidate opencode cache directories, override first
fn opencode_cache_dirs() -> Vec<PathBuf> {
    if let Some(dir) = crate::env::opencode_cache_dir() {
        return vec![dir];
    }
    let mut dirs_out = Vec::new();
    if let Some(cache) = dirs::cache_dir() {
        dirs_out.push(cache.join("opencode"));
    }
    if let Some(data) = dirs::data_local_dir() {
        dirs_out.push(data.join("opencode").join("node_modules"));
    }
    dirs_out
}

/// Table from cli-kind to strategy, with a generic fallback for custom kinds
pub struct StrategyRegistry {
    strategies: HashMap<CliKind, CliStrategy>,
    generic: CliStrategy,
}

impl StrategyRegistry {
    pub fn new() -> Result<Self, regex::Error> {
        let mut strategies = HashMap::new();
        for kind in CliKind::known_kinds() {
            strategies.insert(kind.clone(), CliStrategy::build(kind)?);
        }
        Ok(Self {
            strategies,
            generic: CliStrategy::build(CliKind::Custom("generic".to_string()))?,
        })
    }

    /// Strategy for a kind. Unregistered custom kinds get the generic
    /// adapter (extra-args argv, prompt on stdin, common signatures).
    pub fn get(&self, kind: &CliKind) -> &CliStrategy {
        self.strategies.get(kind).unwrap_or(&self.generic)
    }

    /// Register a user-extended kind with its own strategy
    pub fn register(&mut self, strategy: CliStrategy) {
        self.strategies.insert(strategy.kind.clone(), strategy);
    }

    /// Build a strategy for a custom kind so it can be registered
    pub fn strategy_for(kind: CliKind) -> Result<CliStrategy, regex::Error> {
        CliStrategy::build(kind)
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
