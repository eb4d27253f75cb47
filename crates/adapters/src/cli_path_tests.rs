// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn env_override_wins_when_the_file_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let binary = tmp.path().join("claude");
    std::fs::write(&binary, "#!/bin/sh\n").unwrap();
    std::env::set_var("LOOPWORK_CLAUDE_PATH", &binary);

    assert_eq!(resolve(&CliKind::Claude), Some(binary));

    std::env::remove_var("LOOPWORK_CLAUDE_PATH");
}

#[test]
#[serial]
fn missing_override_falls_back_to_path_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let bin_dir = tmp.path().join("bin");
    std::fs::create_dir(&bin_dir).unwrap();
    let binary = bin_dir.join("droid");
    std::fs::write(&binary, "").unwrap();

    let saved_path = std::env::var_os("PATH");
    std::env::set_var("LOOPWORK_DROID_PATH", tmp.path().join("nope"));
    std::env::set_var("PATH", &bin_dir);

    let resolved = resolve(&CliKind::Droid);

    std::env::remove_var("LOOPWORK_DROID_PATH");
    if let Some(saved) = saved_path {
        std::env::set_var("PATH", saved);
    }
    assert_eq!(resolved, Some(binary));
}

#[test]
#[serial]
fn uninstalled_kind_resolves_to_none() {
    let tmp = tempfile::tempdir().unwrap();
    let saved_path = std::env::var_os("PATH");
    std::env::set_var("PATH", tmp.path());
    let resolved = resolve(&CliKind::Kilocode);
    if let Some(saved) = saved_path {
        std::env::set_var("PATH", saved);
    }
    assert_eq!(resolved, None);
}

#[test]
#[serial]
fn custom_kind_uses_its_own_binary_name() {
    let tmp = tempfile::tempdir().unwrap();
    let binary = tmp.path().join("aider");
    std::fs::write(&binary, "").unwrap();
    let saved_path = std::env::var_os("PATH");
    std::env::set_var("PATH", tmp.path());

    let kind = CliKind::Custom("aider".to_string());
    let resolved = resolve(&kind);
    if let Some(saved) = saved_path {
        std::env::set_var("PATH", saved);
    }
    assert_eq!(resolved, Some(binary));
}
