// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lw_core::CliKind;
use yare::parameterized;

fn registry() -> StrategyRegistry {
    StrategyRegistry::new().unwrap()
}

fn config(kind: CliKind) -> ModelConfig {
    ModelConfig::new("m1", kind, "model-x")
}

#[test]
fn claude_takes_prompt_on_stdin_with_bare_argv() {
    let registry = registry();
    let mut cfg = config(CliKind::Claude);
    cfg.extra_args = vec!["--verbose".to_string()];
    let inv = registry.get(&CliKind::Claude).prepare(&cfg, "do it", &[]);
    assert_eq!(inv.argv, vec!["--verbose"]);
    assert_eq!(inv.stdin_input.as_deref(), Some("do it"));
}

#[test]
fn opencode_embeds_model_and_prompt_in_argv() {
    let registry = registry();
    let inv = registry
        .get(&CliKind::Opencode)
        .prepare(&config(CliKind::Opencode), "fix the bug", &[]);
    assert_eq!(inv.argv, vec!["run", "--model", "model-x", "fix the bug"]);
    assert!(inv.stdin_input.is_none());
}

#[test]
fn opencode_defaults_its_permission_env_when_absent() {
    let registry = registry();
    let inv = registry
        .get(&CliKind::Opencode)
        .prepare(&config(CliKind::Opencode), "p", &[]);
    let permission = inv
        .env
        .iter()
        .find(|(k, _)| k == "OPENCODE_PERMISSION")
        .map(|(_, v)| v.as_str());
    assert_eq!(permission, Some(r#"{"*":"allow"}"#));
}

#[test]
fn opencode_keeps_a_caller_supplied_permission_env() {
    let registry = registry();
    let permissions = vec![("OPENCODE_PERMISSION".to_string(), "strict".to_string())];
    let inv = registry
        .get(&CliKind::Opencode)
        .prepare(&config(CliKind::Opencode), "p", &permissions);
    let values: Vec<&str> = inv
        .env
        .iter()
        .filter(|(k, _)| k == "OPENCODE_PERMISSION")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(values, vec!["strict"]);
}

#[test]
fn gemini_passes_model_flag_and_prompt_on_stdin() {
    let registry = registry();
    let inv = registry
        .get(&CliKind::Gemini)
        .prepare(&config(CliKind::Gemini), "summarize", &[]);
    assert_eq!(inv.argv, vec!["--model", "model-x"]);
    assert_eq!(inv.stdin_input.as_deref(), Some("summarize"));
}

#[parameterized(
    droid = { CliKind::Droid, vec!["exec", "go"] },
    crush = { CliKind::Crush, vec!["run", "-m", "model-x", "go"] },
)]
fn prompt_in_argv_kinds(kind: CliKind, expected: Vec<&str>) {
    let registry = registry();
    let inv = registry.get(&kind).prepare(&config(kind.clone()), "go", &[]);
    assert_eq!(inv.argv, expected);
    assert!(inv.stdin_input.is_none());
}

#[test]
fn kimi_copies_api_key_from_permissions() {
    let registry = registry();
    let permissions = vec![("KIMI_API_KEY".to_string(), "sk-123".to_string())];
    let inv = registry
        .get(&CliKind::Kimi)
        .prepare(&config(CliKind::Kimi), "p", &permissions);
    let moonshot = inv
        .env
        .iter()
        .find(|(k, _)| k == "MOONSHOT_API_KEY")
        .map(|(_, v)| v.as_str());
    assert_eq!(moonshot, Some("sk-123"));
}

#[test]
fn extra_args_append_after_the_template() {
    let registry = registry();
    let mut cfg = config(CliKind::Crush);
    cfg.extra_args = vec!["--yolo".to_string()];
    let inv = registry.get(&CliKind::Crush).prepare(&cfg, "go", &[]);
    assert_eq!(inv.argv.last().map(String::as_str), Some("--yolo"));
}

#[test]
fn display_name_falls_back_to_the_logical_name() {
    let registry = registry();
    let mut cfg = config(CliKind::Claude);
    cfg.display_name = String::new();
    let inv = registry.get(&CliKind::Claude).prepare(&cfg, "p", &[]);
    assert_eq!(inv.display_name, "m1");
}

#[parameterized(
    plain = { "Error: rate limit reached" },
    spaced = { "You hit a Rate Limit, slow down" },
    too_many = { "HTTP 429 Too Many Requests" },
    message_cap = { "You have hit your message limit for today" },
)]
fn claude_rate_limit_signatures(output: &str) {
    let registry = registry();
    assert!(registry.get(&CliKind::Claude).is_rate_limited(output));
}

#[test]
fn gemini_recognizes_resource_exhausted() {
    let registry = registry();
    let strategy = registry.get(&CliKind::Gemini);
    assert!(strategy.is_rate_limited("status: RESOURCE_EXHAUSTED"));
    assert!(strategy.is_rate_limited("Free Tier Rate Limit Exceeded"));
}

#[parameterized(
    quota = { "your quota exceeded for the month" },
    billing = { "Billing limit reached" },
    token = { "token limit exhausted" },
)]
fn claude_quota_signatures(output: &str) {
    let registry = registry();
    assert!(registry.get(&CliKind::Claude).is_quota_exhausted(output));
}

#[test]
fn quota_and_rate_limit_are_distinct_classes() {
    let registry = registry();
    let strategy = registry.get(&CliKind::Claude);
    assert!(!strategy.is_quota_exhausted("rate limit"));
    assert!(!strategy.is_rate_limited("billing limit"));
}

#[test]
fn only_opencode_detects_cache_corruption() {
    let registry = registry();
    let line = "ENOENT: no such file, open '/home/u/.cache/opencode/node_modules/x/package.json'";
    assert!(registry.get(&CliKind::Opencode).detect_cache_corruption(line));
    assert!(!registry.get(&CliKind::Claude).detect_cache_corruption(line));
    assert!(!registry
        .get(&CliKind::Opencode)
        .detect_cache_corruption("ordinary output"));
}

#[test]
fn custom_kind_falls_back_to_the_generic_adapter() {
    let registry = registry();
    let kind = CliKind::Custom("aider".to_string());
    let inv = registry.get(&kind).prepare(&config(kind.clone()), "p", &[]);
    assert!(inv.argv.is_empty());
    assert_eq!(inv.stdin_input.as_deref(), Some("p"));
    assert!(registry.get(&kind).is_rate_limited("429"));
}

#[test]
#[serial_test::serial]
fn clear_cache_removes_the_override_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = tmp.path().join("opencode-cache");
    std::fs::create_dir_all(cache.join("node_modules")).unwrap();
    std::env::set_var("LOOPWORK_OPENCODE_CACHE_DIR", &cache);

    let registry = registry();
    assert!(registry.get(&CliKind::Opencode).clear_cache());
    assert!(!cache.exists());

    // Idempotent: clearing an already-missing cache still succeeds
    assert!(registry.get(&CliKind::Opencode).clear_cache());

    std::env::remove_var("LOOPWORK_OPENCODE_CACHE_DIR");
}
